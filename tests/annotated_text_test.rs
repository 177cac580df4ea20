// Behaviour of the annotated text container through its public API

use annotext::{AnnotatedText, Containment, Tag, TagOrder, TextError};
use serde_json::json;

const FOX: &str = "The brown fox jumped over the green frog.";

fn tag(ns: &str, id: &str, offsets: &[usize]) -> Tag {
    Tag::new(ns, id, offsets).expect("valid offsets")
}

fn fox() -> AnnotatedText {
    AnnotatedText::with_tags(
        FOX,
        vec![
            (tag("penn", "NN", &[10, 13]), None),
            (tag("penn", "NN", &[36, 40]), None),
            (tag("offset", "order", &[10, 12]), None),
        ],
    )
    .expect("bulk load should succeed")
}

#[test]
fn test_point_query_finds_enclosing_tag() {
    let text = fox();
    let found = text.get(12, Containment::Covers);
    assert_eq!(found, vec![&tag("penn", "NN", &[10, 13])]);
}

#[test]
fn test_contained_queries() {
    let text = fox();
    let penn: Vec<&Tag> = text
        .get(11..13, Containment::Contained)
        .into_iter()
        .filter(|t| t.namespace() == "penn")
        .collect();
    assert!(penn.is_empty(), "(10, 13) is not inside [11, 13)");

    let found = text.get(10..13, Containment::Contained);
    assert_eq!(found, vec![&tag("penn", "NN", &[10, 13]), &tag("offset", "order", &[10, 12])]);
}

#[test]
fn test_key_and_reverse_key_orders() {
    let text = fox();

    let key: Vec<String> = text.tags(TagOrder::Key).iter().map(|t| t.to_string()).collect();
    assert_eq!(key, vec!["penn:NN(10, 13)", "offset:order(10, 12)", "penn:NN(36, 40)"]);

    let reverse: Vec<String> = text.tags(TagOrder::ReverseKey).iter().map(|t| t.to_string()).collect();
    assert_eq!(reverse, vec!["penn:NN(36, 40)", "penn:NN(10, 13)", "offset:order(10, 12)"]);
}

#[test]
fn test_key_order_is_non_decreasing_under_mixed_edits() {
    let mut text = AnnotatedText::new("x".repeat(64));

    // a deterministic scatter of spans, points and multi-spans
    for i in 0..40usize {
        let start = (i * 17) % 60;
        let offsets = match i % 3 {
            0 => vec![start],
            1 => vec![start, start + 1 + (i % 4)],
            _ => vec![start, start + 1, start + 2, start + 4],
        };
        let ns = if i % 2 == 0 { "even" } else { "odd" };
        text.add(Tag::new(ns, format!("t{}", i % 5), &offsets).unwrap(), None).unwrap();
    }
    text.remove(20..30, Containment::Contained);

    let tags = text.tags(TagOrder::Key);
    assert!(tags.windows(2).all(|w| w[0] < w[1]), "Key order must be strictly increasing");

    let reverse = text.tags(TagOrder::ReverseKey);
    assert!(reverse.windows(2).all(|w| w[0].reverse_key_cmp(w[1]).is_lt()));
    assert_eq!(tags.len(), reverse.len());
}

#[test]
fn test_duplicate_add_only_updates_attributes() {
    let mut text = fox();
    let before = text.len();
    let nn = tag("penn", "NN", &[10, 13]);

    let added = text.add(nn.clone(), json!({"lemma": "fox"}).as_object().cloned()).unwrap();
    assert!(!added, "re-adding a tag must not insert it again");
    assert_eq!(text.len(), before);
    assert_eq!(text.attributes(&nn).unwrap()["lemma"], "fox");
}

#[test]
fn test_out_of_order_offsets_are_rejected() {
    let mut text = AnnotatedText::new("01234567890123456789");
    assert!(matches!(Tag::new("a", "b", &[10, 8]), Err(TextError::InvalidOffset { .. })));
    assert!(matches!(text.add(tag("a", "b", &[19, 21]), None), Err(TextError::InvalidOffset { .. })));
    assert!(text.is_empty());
}

#[test]
fn test_tokens_and_tag_text() {
    let text = fox();
    let tokens = text.tokens("penn");
    let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(words, vec!["fox", "frog"]);

    assert_eq!(text.tag_text(&tag("x", "y", &[4, 9])).unwrap(), "brown");
    assert!(text.tag_text(&tag("x", "y", &[40, 99])).is_err());
}

#[test]
fn test_clone_is_independent() {
    let original = fox();
    let mut copy = original.clone();
    copy.remove_namespace("offset");

    assert_eq!(original.len(), 3);
    assert_eq!(copy.len(), 2);
    assert_ne!(original, copy);
}
