use std::collections::HashMap;

use glossa_protocol::{Annotation, AnnotationId};

pub const DEFAULT_PALETTE_SIZE: usize = 4;

/// Stable per-annotation color assignment.
///
/// The color index is the annotation's position among the matchable entries
/// of the Stage-1 (navigation-range) filtered list, mod the palette size.
/// Secondary filtering never feeds into this computation. Identical Stage-1
/// input yields identical assignments.
pub fn color_indices(
    stage1: &[Annotation],
    palette_size: usize,
) -> HashMap<AnnotationId, usize> {
    let palette = palette_size.max(1);
    let mut indices = HashMap::new();
    let mut position = 0usize;

    for annotation in stage1 {
        if annotation.is_matchable() {
            indices.insert(annotation.id.clone(), position % palette);
            position += 1;
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_protocol::AnnotationKind;

    fn annotation(id: &str, quote: &str, occurrence: Option<u32>) -> Annotation {
        Annotation {
            id: AnnotationId::from(id),
            kind: AnnotationKind::Note,
            reference: "1:1".into(),
            quote: quote.into(),
            occurrence,
        }
    }

    #[test]
    fn test_positions_skip_unmatchable_entries() {
        let stage1 = vec![
            annotation("a", "λόγος", Some(1)),
            annotation("b", "", Some(1)),        // no quote
            annotation("c", "θεός", None),       // no occurrence
            annotation("d", "ἀρχή", Some(2)),
        ];
        let colors = color_indices(&stage1, 4);

        assert_eq!(colors.get(&AnnotationId::from("a")), Some(&0));
        assert_eq!(colors.get(&AnnotationId::from("d")), Some(&1));
        assert!(!colors.contains_key(&AnnotationId::from("b")));
        assert!(!colors.contains_key(&AnnotationId::from("c")));
    }

    #[test]
    fn test_wraps_at_palette_size() {
        let stage1: Vec<Annotation> = (0..6)
            .map(|i| annotation(&format!("n{i}"), "λόγος", Some(1)))
            .collect();
        let colors = color_indices(&stage1, 4);
        assert_eq!(colors.get(&AnnotationId::from("n4")), Some(&0));
        assert_eq!(colors.get(&AnnotationId::from("n5")), Some(&1));
    }

    #[test]
    fn test_same_input_same_assignment() {
        let stage1 = vec![
            annotation("a", "λόγος", Some(1)),
            annotation("b", "θεός", Some(1)),
        ];
        assert_eq!(color_indices(&stage1, 4), color_indices(&stage1, 4));
    }
}
