//! Plain-text ingestion.
//!
//! Turns prose into a corpus the cheap way: atoms are Unicode word segments
//! (punctuation included, whitespace dropped), and two chunk sets come
//! pre-registered:
//!
//! | name       | chunks                    | attributes      |
//! |------------|---------------------------|-----------------|
//! | `document` | one, covering every atom  | `id`            |
//! | `sentence` | one per sentence boundary | `id`, `ordinal` |
//!
//! Segmentation follows UAX #29 via `unicode-segmentation`, so "U.S.A."
//! stays one sentence and "naïve" stays one atom. Anything fancier (OCR
//! layout, code, tables) belongs in its own adapter; see
//! [`corpus_from_tesseract`](crate::corpus_from_tesseract).

use unicode_segmentation::UnicodeSegmentation;

use crate::col;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::table::{Column, Table};
use crate::value::{hash_id, Value};
use crate::ChunkSet;

/// Atomize `text` into a corpus with `document` and `sentence` chunk sets.
///
/// Atom ids are derived from `document_id` and position, so corpora built
/// from different documents merge without collisions; ingesting the same
/// document twice collides by design.
///
/// Atoms carry `id`, `text`, and a 1-based `ordinal`. Whitespace-only
/// sentence spans produce no chunk; the `document` chunk exists even for
/// empty text.
///
/// # Errors
///
/// Construction errors surface only for degenerate tokenizations (atom id
/// hash collisions within one document).
pub fn corpus_from_text(text: &str, document_id: &str) -> Result<Corpus> {
    let mut atom_ids = Vec::new();
    let mut atom_texts = Vec::new();
    let mut atom_ordinals = Vec::new();

    let mut sentence_ids = Vec::new();
    let mut sentence_ordinals = Vec::new();
    let mut member_chunk = Vec::new();
    let mut member_atom = Vec::new();

    let mut ordinal = 0i64;
    for sentence in text.split_sentence_bounds() {
        let first_row = atom_ids.len();
        for token in sentence.split_word_bounds() {
            if token.chars().all(char::is_whitespace) {
                continue;
            }
            ordinal += 1;
            atom_ids.push(Value::Int(hash_id(&(document_id, ordinal))));
            atom_texts.push(Value::from(token));
            atom_ordinals.push(Value::Int(ordinal));
        }
        if atom_ids.len() == first_row {
            continue;
        }
        let nth = sentence_ids.len() as i64 + 1;
        let sentence_id = Value::Int(hash_id(&("sentence", document_id, nth)));
        sentence_ordinals.push(Value::Int(nth));
        for row in first_row..atom_ids.len() {
            member_chunk.push(sentence_id.clone());
            member_atom.push(atom_ids[row].clone());
        }
        sentence_ids.push(sentence_id);
    }

    let document = Value::from(document_id);
    let doc_members = atom_ids.clone();

    let atoms = Table::from_columns([
        (col::ID, Column::from(atom_ids)),
        (col::TEXT, Column::from(atom_texts)),
        (col::ORDINAL, Column::from(atom_ordinals)),
    ])?;
    let mut corpus = Corpus::new(atoms)?;

    let doc_chunks = Table::from_columns([(col::ID, Column::from(vec![document.clone()]))])?;
    let doc_memberships = Table::from_columns([
        (
            col::CHUNK,
            Column::from(vec![document; doc_members.len()]),
        ),
        (col::ATOM, Column::from(doc_members)),
    ])?;
    let documents = ChunkSet::new(&corpus, doc_chunks, doc_memberships)?;
    corpus.set_chunk("document", &documents)?;

    let sentence_chunks = Table::from_columns([
        (col::ID, Column::from(sentence_ids)),
        (col::ORDINAL, Column::from(sentence_ordinals)),
    ])?;
    let sentence_memberships = Table::from_columns([
        (col::CHUNK, Column::from(member_chunk)),
        (col::ATOM, Column::from(member_atom)),
    ])?;
    let sentences = ChunkSet::new(&corpus, sentence_chunks, sentence_memberships)?;
    corpus.set_chunk("sentence", &sentences)?;

    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stringify::Stringify;

    fn texts(corpus: &Corpus) -> Vec<String> {
        corpus
            .atoms()
            .column(col::TEXT)
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn punctuation_becomes_its_own_atom() {
        let corpus = corpus_from_text("Pack my box.", "doc").unwrap();
        assert_eq!(texts(&corpus), ["Pack", "my", "box", "."]);
    }

    #[test]
    fn ordinals_are_dense_and_one_based() {
        let corpus = corpus_from_text("one  two\nthree", "doc").unwrap();
        let ordinals: Vec<_> = corpus
            .atoms()
            .column(col::ORDINAL)
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(
            ordinals,
            [Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn document_chunk_covers_every_atom() {
        let corpus = corpus_from_text("a b c", "doc-7").unwrap();
        let documents = corpus.chunk("document").unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents.memberships().len(), 3);
        assert_eq!(
            documents.chunks().value(col::ID, 0),
            Some(&Value::from("doc-7"))
        );
    }

    #[test]
    fn sentences_partition_in_reading_order() {
        let corpus = corpus_from_text("A b. C d. E f.", "doc").unwrap();
        let sentences = corpus.chunk("sentence").unwrap();
        assert_eq!(sentences.len(), 3);

        let joined = sentences
            .enrich(&[("text", &Stringify::default())])
            .unwrap();
        assert_eq!(
            joined.chunks().value("text", 0),
            Some(&Value::from("A b ."))
        );
        assert_eq!(
            joined.chunks().value("text", 2),
            Some(&Value::from("E f ."))
        );
        assert_eq!(
            joined.chunks().value(col::ORDINAL, 1),
            Some(&Value::Int(2))
        );
    }

    #[test]
    fn abbreviations_do_not_split_on_every_period() {
        let corpus =
            corpus_from_text("Dr. Smith went to Washington D.C. on Tuesday.", "doc").unwrap();
        // UAX #29 keeps "D.C. on" attached (lowercase continuation);
        // "Dr. Smith" may still split
        let n = corpus.chunk("sentence").unwrap().len();
        assert!(n <= 2, "too many sentence splits: {n}");
    }

    #[test]
    fn distinct_documents_get_distinct_atom_ids() {
        let a = corpus_from_text("same words", "doc-a").unwrap();
        let b = corpus_from_text("same words", "doc-b").unwrap();
        let merged = Corpus::merge([&a, &b]).unwrap();
        assert_eq!(merged.atoms().len(), 4);
        assert_eq!(merged.chunk("document").unwrap().len(), 2);
        assert_eq!(merged.chunk("sentence").unwrap().len(), 2);
    }

    #[test]
    fn empty_text_still_has_a_document() {
        let corpus = corpus_from_text("   ", "blank").unwrap();
        assert_eq!(corpus.atoms().len(), 0);
        assert_eq!(corpus.chunk("document").unwrap().len(), 1);
        assert!(corpus.chunk("document").unwrap().memberships().is_empty());
        assert_eq!(corpus.chunk("sentence").unwrap().len(), 0);
    }

    #[test]
    fn segmentation_is_unicode_aware() {
        let corpus = corpus_from_text("naïve café.", "doc").unwrap();
        assert_eq!(texts(&corpus), ["naïve", "café", "."]);
    }
}
