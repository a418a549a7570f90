//! Splits a flat tag stream into per-item groups.

use crate::protocol::Tag;

/// Returns a lazy iterator over the groups of `tags` delimited by `boundary`.
///
/// A new group starts right before each `boundary` tag that follows at least
/// one buffered tag. The boundary name is compared ignoring ASCII case.
/// Groups are never empty.
pub fn segment<I>(tags: I, boundary: &str) -> TagGroups<'_, I::IntoIter>
where
    I: IntoIterator<Item = Tag>,
{
    TagGroups {
        tags: tags.into_iter(),
        boundary,
        pending: None,
    }
}

/// Iterator returned by [`segment`].
pub struct TagGroups<'a, I> {
    tags: I,
    boundary: &'a str,
    /// Boundary tag that closed the previous group and opens the next one.
    pending: Option<Tag>,
}

impl<I: Iterator<Item = Tag>> Iterator for TagGroups<'_, I> {
    type Item = Vec<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group: Vec<Tag> = self.pending.take().into_iter().collect();

        for tag in self.tags.by_ref() {
            if tag.is(self.boundary) && !group.is_empty() {
                self.pending = Some(tag);
                return Some(group);
            }
            group.push(tag);
        }

        (!group.is_empty()).then_some(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
        pairs.iter().map(|&(n, v)| Tag::new(n, v)).collect()
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(segment(Vec::new(), "file").count(), 0);
    }

    #[test]
    fn single_item_is_one_group() {
        let groups: Vec<_> = segment(tags(&[("file", "a"), ("Title", "A")]), "file").collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn splits_before_each_later_boundary() {
        let input = tags(&[
            ("file", "a.mp3"),
            ("album", "Live"),
            ("albumartist", "X"),
            ("file", "b.mp3"),
            ("album", "Live"),
            ("albumartist", "X"),
        ]);
        let groups: Vec<_> = segment(input, "file").collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].value, "a.mp3");
        assert_eq!(groups[1][0].value, "b.mp3");
        assert_eq!(groups[1].len(), 3);
    }

    #[test]
    fn boundary_match_ignores_case() {
        let input = tags(&[("File", "a"), ("FILE", "b")]);
        assert_eq!(segment(input, "file").count(), 2);
    }

    #[test]
    fn leading_tags_form_their_own_group() {
        let input = tags(&[("Title", "A"), ("file", "a"), ("Title", "B"), ("file", "b")]);
        let groups: Vec<_> = segment(input, "file").collect();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], tags(&[("Title", "A")]));
        assert_eq!(groups[1], tags(&[("file", "a"), ("Title", "B")]));
        assert_eq!(groups[2], tags(&[("file", "b")]));
    }

    #[test]
    fn group_count_matches_boundaries_with_buffered_tags() {
        let input = tags(&[
            ("file", "a"),
            ("file", "b"),
            ("Title", "B"),
            ("file", "c"),
        ]);
        // Only boundaries preceded by buffered tags split, plus the trailing group
        let groups: Vec<_> = segment(input, "file").collect();
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn is_lazy() {
        let input = (0..).map(|i| Tag::new("file", i.to_string()));
        let first: Vec<_> = segment(input, "file").take(2).collect();
        assert_eq!(first[1][0].value, "1");
    }
}
