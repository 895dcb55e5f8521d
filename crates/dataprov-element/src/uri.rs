//! Element construction from URI strings.

use dataprov_plugin::{Plugin, Usability};

use crate::error::{ElementError, ElementResult};
use crate::file::FileElement;
use crate::memory::MemoryElement;
use crate::traits::DataElement;
use crate::url::UrlElement;

/// Parses a URI into an element, or explains why it cannot.
pub type UriResolver = fn(&str) -> ElementResult<Box<dyn DataElement>>;

/// Built-in resolvers in the order they are tried.
pub fn builtin_resolvers() -> Vec<(&'static str, UriResolver)> {
    let mut resolvers = vec![
        (<MemoryElement as Plugin<dyn DataElement>>::NAME, memory_from_uri as UriResolver),
        (<FileElement as Plugin<dyn DataElement>>::NAME, file_from_uri as UriResolver),
    ];
    if let Usability::Usable = <UrlElement as Plugin<dyn DataElement>>::usability() {
        resolvers.push((<UrlElement as Plugin<dyn DataElement>>::NAME, url_from_uri as UriResolver));
    }
    resolvers
}

fn memory_from_uri(uri: &str) -> ElementResult<Box<dyn DataElement>> {
    Ok(Box::new(MemoryElement::from_uri(uri)?))
}

fn file_from_uri(uri: &str) -> ElementResult<Box<dyn DataElement>> {
    Ok(Box::new(FileElement::from_uri(uri)?))
}

fn url_from_uri(uri: &str) -> ElementResult<Box<dyn DataElement>> {
    Ok(Box::new(UrlElement::from_uri(uri)?))
}

/// Build an element from a URI using the built-in resolvers.
pub fn from_uri(uri: &str) -> ElementResult<Box<dyn DataElement>> {
    from_uri_with(uri, &builtin_resolvers())
}

/// Try each resolver in turn; the first to accept the URI wins.
///
/// When none accepts it, the error collects every resolver's reason.
pub fn from_uri_with(uri: &str, resolvers: &[(&'static str, UriResolver)]) -> ElementResult<Box<dyn DataElement>> {
    let mut reasons = Vec::with_capacity(resolvers.len());
    for (name, resolve) in resolvers {
        match resolve(uri) {
            Ok(element) => return Ok(element),
            Err(ElementError::InvalidUri { reason, .. }) => reasons.push(format!("{name}: {reason}")),
            Err(other) => return Err(other),
        }
    }
    if reasons.is_empty() {
        reasons.push("no resolvers available".to_string());
    }
    Err(ElementError::invalid_uri(uri, reasons.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprov_plugin::Configurable;

    #[test]
    fn resolves_each_builtin_form() {
        let e = from_uri("base64://aGVsbG8=").unwrap();
        assert_eq!(e.plugin_name(), "MemoryElement");
        assert_eq!(e.get_bytes().unwrap(), b"hello");

        let e = from_uri("file:///tmp/some/file.bin").unwrap();
        assert_eq!(e.plugin_name(), "FileElement");

        assert_eq!(from_uri("").unwrap().plugin_name(), "MemoryElement");
    }

    #[test]
    fn unresolvable_uri_collects_reasons() {
        let err = from_uri("ftp://host/file").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MemoryElement"));
        assert!(msg.contains("FileElement"));
        assert!(matches!(err, ElementError::InvalidUri { .. }));
    }

    #[test]
    fn empty_resolver_list() {
        let err = from_uri_with("base64://aGk=", &[]).unwrap_err();
        assert!(err.to_string().contains("no resolvers available"));
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn web_uris_need_http_feature() {
        assert!(from_uri("https://example.com/x.png").is_err());
    }
}
