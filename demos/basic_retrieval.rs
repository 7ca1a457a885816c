//! Basic Retrieval
//!
//! The minimal example: atomize a document, derive chunks, score and select.
//!
//! ```bash
//! cargo run --example basic_retrieval
//! ```

use quarry::{corpus_from_text, Cmp, FixedWindow, RegexCount, Stringify, Threshold, TopK};

fn main() -> quarry::Result<()> {
    let document = "Machine learning models learn patterns from data. \
        They generalize these patterns to make predictions. \
        This is fundamentally different from traditional programming. \
        Deep learning extends this with multiple hidden layers. \
        Each layer learns increasingly abstract representations.";

    let mut corpus = corpus_from_text(document, "ml-notes")?;

    println!("Atoms:      {}", corpus.atoms().len());
    println!("Chunk sets: {:?}\n", corpus.chunk_names().collect::<Vec<_>>());

    // Sentences come for free from UAX #29 segmentation.
    let sentences = corpus.chunk("sentence")?;
    println!("Sentences:  {}", sentences.len());

    // Sliding windows over the whole document: 8 atoms per window,
    // each overlapping the previous one by 2.
    let windows = corpus.derive(&FixedWindow::new("document", 8, -2))?;
    corpus.set_chunk("window", &windows)?;
    println!("Windows:    {}\n", windows.len());

    // Score every window by how often "pattern" appears, keep the
    // two best, and read the text back out.
    let hits = RegexCount::new(Stringify::new(" "), "pattern")?;
    let best = corpus
        .chunk("window")?
        .enrich(&[("hits", &hits)])?
        .filter(&[
            &Threshold::new("hits", Cmp::Gt, 0i64),
            &TopK::new("hits", 2),
        ])?;
    let out = best.select(&["hits"], &[("text", &Stringify::new(" "))])?;

    for row in 0..out.len() {
        let hits = &out.try_column("hits")?.values()[row];
        let text = out.try_column("text")?.values()[row].as_str().unwrap_or("");
        println!("[{hits} hits] \"{text}\"");
    }

    // Every stage above is a plain value: windows can be re-registered,
    // scores re-derived, and filters re-ordered without touching atoms.
    Ok(())
}
