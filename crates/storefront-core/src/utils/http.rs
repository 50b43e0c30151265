//! Query-string helpers.

/// Encodes `pairs` as an `application/x-www-form-urlencoded` query string.
///
/// Pairs keep their order; spaces become `+`.
///
/// ```
/// use storefront_core::utils::http::urlencode;
///
/// assert_eq!(urlencode(&[("collection__id", "3")]), "collection__id=3");
/// assert_eq!(urlencode(&[("q", "a b"), ("p", "2")]), "q=a+b&p=2");
/// ```
pub fn urlencode<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish()
}

/// Parses a query string into ordered key/value pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}
