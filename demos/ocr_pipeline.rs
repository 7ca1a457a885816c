//! OCR Retrieval Pipeline
//!
//! Ingests Tesseract TSV output and runs layout-aware retrieval over it.
//!
//! ```bash
//! cargo run --example ocr_pipeline
//! ```

use quarry::{
    corpus_from_tesseract, records_from_tsv, ChunkOverlap, DelimitedStringify, EqualTo,
    OverlapAgg, PatternChunk, Stringify,
};

/// One scanned receipt, as Tesseract's `--psm 1 tsv` output would shape it:
/// a page, a block, three paragraphs (header, item table, total line).
const RECEIPT_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
    1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
    2\t1\t1\t0\t0\t0\t40\t40\t520\t300\t-1\t\n\
    3\t1\t1\t1\t0\t0\t40\t40\t260\t40\t-1\t\n\
    4\t1\t1\t1\t1\t0\t40\t40\t260\t40\t-1\t\n\
    5\t1\t1\t1\t1\t1\t40\t40\t120\t40\t96.1\tACME\n\
    5\t1\t1\t1\t1\t2\t170\t40\t130\t40\t95.4\tHardware\n\
    3\t1\t1\t2\t0\t0\t40\t120\t360\t140\t-1\t\n\
    4\t1\t1\t2\t1\t0\t40\t120\t300\t30\t-1\t\n\
    5\t1\t1\t2\t1\t1\t40\t120\t60\t30\t96.8\tQty\n\
    5\t1\t1\t2\t1\t2\t110\t120\t90\t30\t95.2\tItem\n\
    5\t1\t1\t2\t1\t3\t210\t120\t100\t30\t96.0\tPrice\n\
    4\t1\t1\t2\t2\t0\t40\t160\t320\t30\t-1\t\n\
    5\t1\t1\t2\t2\t1\t40\t160\t20\t30\t93.7\t2\n\
    5\t1\t1\t2\t2\t2\t70\t160\t140\t30\t91.9\twashers\n\
    5\t1\t1\t2\t2\t3\t220\t160\t80\t30\t94.5\t0.80\n\
    4\t1\t1\t2\t3\t0\t40\t200\t310\t30\t-1\t\n\
    5\t1\t1\t2\t3\t1\t40\t200\t20\t30\t95.8\t1\n\
    5\t1\t1\t2\t3\t2\t70\t200\t130\t30\t92.4\thammer\n\
    5\t1\t1\t2\t3\t3\t210\t200\t90\t30\t95.1\t12.00\n\
    3\t1\t1\t3\t0\t0\t40\t280\t230\t40\t-1\t\n\
    4\t1\t1\t3\t1\t0\t40\t280\t230\t40\t-1\t\n\
    5\t1\t1\t3\t1\t1\t40\t280\t110\t40\t96.5\tTotal\n\
    5\t1\t1\t3\t1\t2\t160\t280\t110\t40\t94.9\t13.60\n";

fn main() -> quarry::Result<()> {
    println!("OCR Retrieval Pipeline");
    println!("======================\n");

    let records = records_from_tsv(RECEIPT_TSV)?;
    let corpus = corpus_from_tesseract(&records, "receipt-0042")?;

    // Section 1: every Tesseract level lands as a chunk set over one
    // shared table of word atoms.
    println!("1. Ingestion");
    println!("   ---------");
    for name in corpus.chunk_names() {
        println!("   {:<10} {} chunk(s)", name, corpus.chunk(name)?.len());
    }
    println!("   word atoms: {}\n", corpus.atoms().len());

    // Section 2: rebuild readable text from the atoms, with delimiters
    // chosen by which layout boundary separates two neighbouring words.
    println!("2. Reconstruction");
    println!("   --------------");
    let paragraphs = corpus.chunk("paragraph")?;
    let lines = corpus.chunk("line")?;
    let page_text = DelimitedStringify::new(" ")
        .boundary(&paragraphs, "\n\n")
        .boundary(&lines, "\n");
    let pages = corpus.chunk("page")?.select(&[], &[("text", &page_text)])?;
    for value in pages.try_column("text")? {
        for line in value.as_str().unwrap_or("").lines() {
            println!("   | {line}");
        }
    }
    println!("\n   Note: paragraph breaks win over line breaks where both apply.");

    // Section 3: alignment against a second chunk set. The pattern matches
    // and the OCR lines are independent chunkings of the same atoms, so
    // "which lines are item rows" is a membership overlap, not span math.
    println!("\n3. Item rows via pattern + overlap");
    println!("   -------------------------------");
    let items = corpus.derive(&PatternChunk::new("document", r"\d+ \w+ \d+\.\d+")?)?;
    println!("   pattern matches: {}", items.len());

    let item_lines = lines
        .enrich(&[("is_item", &ChunkOverlap::new(&items, OverlapAgg::Bool))])?
        .filter(&[&EqualTo::new("is_item", [true])])?;
    let table = item_lines.select(&["ordinal"], &[("text", &Stringify::new(" "))])?;
    for row in 0..table.len() {
        let ordinal = &table.try_column("ordinal")?.values()[row];
        let text = table.try_column("text")?.values()[row].as_str().unwrap_or("");
        println!("   line {ordinal}: \"{text}\"");
    }

    println!("\nAtoms never changed; every view above is a table over the same 13 words.");
    Ok(())
}
