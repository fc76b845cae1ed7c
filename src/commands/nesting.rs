use crate::error::{BlockError, BlockResult};

/// Where a new block attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting<'a> {
    /// Directly under the named page.
    Top { page_id: &'a str },
    /// Under an existing non-root block.
    Child { parent_id: &'a str },
}

impl<'a> Nesting<'a> {
    pub fn target_id(&self) -> &'a str {
        match self {
            Nesting::Top { page_id } => page_id,
            Nesting::Child { parent_id } => parent_id,
        }
    }
}

/// Classify a creation request by which of `parent_id` / `page_id` is set.
///
/// Exactly one must be present; empty strings count as absent.
pub fn classify<'a>(
    parent_id: Option<&'a str>,
    page_id: Option<&'a str>,
) -> BlockResult<Nesting<'a>> {
    let parent_id = parent_id.filter(|id| !id.is_empty());
    let page_id = page_id.filter(|id| !id.is_empty());

    match (parent_id, page_id) {
        (Some(parent_id), None) => Ok(Nesting::Child { parent_id }),
        (None, Some(page_id)) => Ok(Nesting::Top { page_id }),
        (Some(_), Some(_)) => Err(BlockError::validation(
            "parent_id and page_id are mutually exclusive",
        )),
        (None, None) => Err(BlockError::validation(
            "one of parent_id or page_id is required",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_and_child() {
        assert_eq!(
            classify(None, Some("p1")).unwrap(),
            Nesting::Top { page_id: "p1" }
        );
        assert_eq!(
            classify(Some("c1"), None).unwrap(),
            Nesting::Child { parent_id: "c1" }
        );
        assert_eq!(classify(Some("c1"), None).unwrap().target_id(), "c1");
    }

    #[test]
    fn test_neither_or_both_rejected() {
        assert!(matches!(
            classify(None, None),
            Err(BlockError::ValidationFailed(_))
        ));
        assert!(matches!(
            classify(Some("c1"), Some("p1")),
            Err(BlockError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        assert_eq!(
            classify(Some(""), Some("p1")).unwrap(),
            Nesting::Top { page_id: "p1" }
        );
        assert!(classify(Some(""), Some("")).is_err());
    }
}
