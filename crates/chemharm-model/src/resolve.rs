/// Synchronous name resolution supplied by the surrounding system.
///
/// Implementations typically wrap a chemical database or translation
/// service. `None` covers both "unknown name" and lookup failure; callers
/// treat either as unresolved and carry on.
pub trait IdentifierResolver {
    /// Resolves a free-text substance name to an identifier such as a CAS
    /// number. `source_lang` is an ISO language code when known.
    fn resolve_identifier(&self, name: &str, source_lang: Option<&str>) -> Option<String>;
}

impl<F> IdentifierResolver for F
where
    F: Fn(&str, Option<&str>) -> Option<String>,
{
    fn resolve_identifier(&self, name: &str, source_lang: Option<&str>) -> Option<String> {
        self(name, source_lang)
    }
}
