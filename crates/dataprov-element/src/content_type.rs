use std::collections::BTreeSet;

use crate::error::{ElementError, ElementResult};
use crate::traits::DataElement;

/// Something that only accepts elements of certain MIME types.
pub trait ContentTypeValidator {
    /// MIME types accepted in this context.
    fn valid_content_types(&self) -> BTreeSet<String>;

    /// Returns `true` if the element reports one of the valid types. An
    /// element with an unknown type is never valid.
    fn is_valid_element(&self, element: &dyn DataElement) -> bool {
        element
            .content_type()
            .is_some_and(|ct| self.valid_content_types().contains(&ct))
    }

    /// Like [`is_valid_element`](Self::is_valid_element), but failing with an
    /// error that lists the accepted types.
    fn check_element(&self, element: &dyn DataElement) -> ElementResult<()> {
        let content_type = element.content_type();
        let valid = self.valid_content_types();
        match &content_type {
            Some(ct) if valid.contains(ct) => Ok(()),
            _ => Err(ElementError::InvalidContentType {
                element: element.locator(),
                content_type,
                valid: valid.into_iter().collect(),
            }),
        }
    }
}

/// Fixed set of accepted content types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTypes(BTreeSet<String>);

impl ContentTypes {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }
}

impl ContentTypeValidator for ContentTypes {
    fn valid_content_types(&self) -> BTreeSet<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryElement;

    fn images() -> ContentTypes {
        ContentTypes::new(["image/png", "image/jpeg"])
    }

    #[test]
    fn matching_type_is_valid() {
        let e = MemoryElement::new(b"x".to_vec(), Some("image/png".into()));
        assert!(images().is_valid_element(&e));
        assert!(images().check_element(&e).is_ok());
    }

    #[test]
    fn unknown_type_is_invalid() {
        let e = MemoryElement::new(b"x".to_vec(), None);
        assert!(!images().is_valid_element(&e));
    }

    #[test]
    fn check_lists_valid_types() {
        let e = MemoryElement::new(b"x".to_vec(), Some("text/plain".into()));
        match images().check_element(&e).unwrap_err() {
            ElementError::InvalidContentType {
                content_type, valid, ..
            } => {
                assert_eq!(content_type.as_deref(), Some("text/plain"));
                assert_eq!(valid, vec!["image/jpeg".to_string(), "image/png".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
