use super::*;

#[test]
fn builtin_documents_resolve() {
    let registry = DocRegistry::builtin();

    assert_eq!(
        registry.resolve("建築基準法施行令"),
        DocKey::Known("doc0".to_string())
    );
    assert_eq!(
        registry.resolve("東京都建築安全条例"),
        DocKey::Known("doc1".to_string())
    );
}

#[test]
fn unknown_document_is_unregistered() {
    let registry = DocRegistry::builtin();

    let key = registry.resolve("some other document");
    assert_eq!(key, DocKey::Unregistered);
    assert!(!key.is_registered());
    assert_eq!(key.raw_id(), "");
}

#[test]
fn chunk_id_format() {
    assert_eq!(chunk_id("doc0", 0), "doc0#chunk0");
    assert_eq!(chunk_id("doc1", 42), "doc1#chunk42");
}

#[test]
fn unregistered_prefix_yields_malformed_chunk_id() {
    // Documented edge case: composing with the empty unregistered prefix is not
    // normalized away and produces an id with no document component.
    let registry = DocRegistry::builtin();
    let key = registry.resolve("unknown.pdf");

    assert_eq!(chunk_id(key.raw_id(), 0), "#chunk0");
}
