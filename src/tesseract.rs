//! Tesseract OCR ingestion.
//!
//! Tesseract's TSV output interleaves five row levels, page (1) through
//! word (5), with per-container numbering that resets inside each parent.
//! This adapter flattens that into a corpus: words become atoms, every
//! container level becomes a registered chunk set, and all numbering is
//! re-based to run cumulatively across the whole document so ordinals stay
//! globally sortable.
//!
//! ```text
//! level 1  page 1                      -> "page"      chunk, ordinal 1
//! level 2    block 1                   -> "block"     chunk, ordinal 1
//! level 3      paragraph 1             -> "paragraph" chunk, ordinal 1
//! level 4        line 1                -> "line"      chunk, ordinal 1
//! level 5          "The"  conf 96.06   -> atom, ordinal 1
//! level 5          "fox"  conf 94.89   -> atom, ordinal 2
//! level 4        line 2                -> "line"      chunk, ordinal 2
//! ...
//! ```
//!
//! Atoms carry `text`, `ordinal`, bounding-box data, `confidence`, and the
//! owning `document` id. Containers carry bounding boxes, a cumulative
//! `ordinal`, and their parent's chunk id (`page` on blocks, `block` on
//! paragraphs, `paragraph` on lines). A `document` chunk set covering all
//! atoms rounds it out, so multi-document corpora stay separable after
//! [`Corpus::merge`].

use crate::col;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::table::{Column, Table};
use crate::value::{hash_id, Value};
use crate::ChunkSet;

/// One row of Tesseract TSV output, numbering still per-container.
#[derive(Debug, Clone, PartialEq)]
pub struct TesseractRecord {
    /// Row kind: 1 page, 2 block, 3 paragraph, 4 line, 5 word.
    pub level: i64,
    /// 1-based page number.
    pub page_num: i64,
    /// Block number, resetting per page.
    pub block_num: i64,
    /// Paragraph number, resetting per block.
    pub par_num: i64,
    /// Line number, resetting per paragraph.
    pub line_num: i64,
    /// Word number, resetting per line.
    pub word_num: i64,
    /// Bounding-box left edge, absolute pixels.
    pub left: i64,
    /// Bounding-box top edge.
    pub top: i64,
    /// Bounding-box width.
    pub width: i64,
    /// Bounding-box height.
    pub height: i64,
    /// Recognition confidence; Tesseract reports -1 for container rows.
    pub conf: f64,
    /// Recognized text; empty for container rows.
    pub text: String,
}

/// Parses Tesseract's `tsv` output format (header line included).
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Anything else that does not parse (wrong field count, non-numeric
/// coordinates, a level outside 1..=5) is a [`Error::MalformedRecord`]
/// carrying the 1-based line number.
pub fn records_from_tsv(tsv: &str) -> Result<Vec<TesseractRecord>> {
    let mut lines = tsv.lines().enumerate();
    let Some((_, header)) = lines.next() else {
        return Err(Error::MalformedRecord {
            line: 1,
            reason: "empty input".into(),
        });
    };
    if !header.starts_with("level\t") {
        return Err(Error::MalformedRecord {
            line: 1,
            reason: "missing tesseract tsv header".into(),
        });
    }

    let mut records = Vec::new();
    for (idx, raw) in lines {
        if raw.is_empty() {
            continue;
        }
        let line = idx + 1;
        let fields: Vec<&str> = raw.split('\t').collect();
        if fields.len() != 12 {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("expected 12 fields, found {}", fields.len()),
            });
        }
        let int = |i: usize, name: &str| {
            fields[i].parse::<i64>().map_err(|_| Error::MalformedRecord {
                line,
                reason: format!("{name}: {:?} is not an integer", fields[i]),
            })
        };

        let level = int(0, "level")?;
        if !(1..=5).contains(&level) {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("level {level} out of range"),
            });
        }
        records.push(TesseractRecord {
            level,
            page_num: int(1, "page_num")?,
            block_num: int(2, "block_num")?,
            par_num: int(3, "par_num")?,
            line_num: int(4, "line_num")?,
            word_num: int(5, "word_num")?,
            left: int(6, "left")?,
            top: int(7, "top")?,
            width: int(8, "width")?,
            height: int(9, "height")?,
            conf: fields[10].parse().map_err(|_| Error::MalformedRecord {
                line,
                reason: format!("conf: {:?} is not a number", fields[10]),
            })?,
            text: fields[11].to_owned(),
        });
    }
    Ok(records)
}

/// Membership rows under construction.
#[derive(Default)]
struct Junction {
    chunk: Vec<Value>,
    atom: Vec<Value>,
}

impl Junction {
    fn push(&mut self, chunk: &Value, atom: &Value) {
        self.chunk.push(chunk.clone());
        self.atom.push(atom.clone());
    }

    fn into_table(self) -> Result<Table> {
        Table::from_columns([
            (col::CHUNK, Column::from(self.chunk)),
            (col::ATOM, Column::from(self.atom)),
        ])
    }
}

/// Chunk-table columns shared by blocks, paragraphs, and lines.
struct Containers {
    parent_name: &'static str,
    parents: Vec<Value>,
    lefts: Vec<Value>,
    tops: Vec<Value>,
    widths: Vec<Value>,
    heights: Vec<Value>,
    ordinals: Vec<Value>,
    ids: Vec<Value>,
}

impl Containers {
    fn new(parent_name: &'static str) -> Self {
        Self {
            parent_name,
            parents: Vec::new(),
            lefts: Vec::new(),
            tops: Vec::new(),
            widths: Vec::new(),
            heights: Vec::new(),
            ordinals: Vec::new(),
            ids: Vec::new(),
        }
    }

    fn push(&mut self, rec: &TesseractRecord, parent: Value, ordinal: i64, id: &Value) {
        self.parents.push(parent);
        self.lefts.push(Value::Int(rec.left));
        self.tops.push(Value::Int(rec.top));
        self.widths.push(Value::Int(rec.width));
        self.heights.push(Value::Int(rec.height));
        self.ordinals.push(Value::Int(ordinal));
        self.ids.push(id.clone());
    }

    fn into_table(self) -> Result<Table> {
        Table::from_columns([
            (self.parent_name, Column::from(self.parents)),
            ("left", Column::from(self.lefts)),
            ("top", Column::from(self.tops)),
            ("width", Column::from(self.widths)),
            ("height", Column::from(self.heights)),
            (col::ORDINAL, Column::from(self.ordinals)),
            (col::ID, Column::from(self.ids)),
        ])
    }
}

/// Five-position coordinate after cumulative renumbering; the `None`s mark
/// which levels a row does not occupy, and participate in the id hash.
type Coord = (
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

fn coord_id(document_id: &str, coord: Coord) -> Value {
    Value::Int(hash_id(&(document_id, coord)))
}

/// Builds a corpus from Tesseract records, words as atoms.
///
/// Registers `document`, `page`, `block`, `paragraph`, and `line` chunk
/// sets. Records may arrive in any order; they are sorted by their
/// positional numbering first. Chunk and atom ids hash the document id
/// together with the renumbered position, so corpora from different
/// documents merge cleanly and re-ingesting the same document collides.
///
/// # Errors
///
/// [`Error::MalformedRecord`] (carrying the 1-based record position) when
/// a word row precedes its containers.
pub fn corpus_from_tesseract(records: &[TesseractRecord], document_id: &str) -> Result<Corpus> {
    let mut ordered: Vec<&TesseractRecord> = records.iter().collect();
    ordered.sort_by_key(|r| (r.page_num, r.block_num, r.par_num, r.line_num, r.word_num));

    let document = Value::from(document_id);

    // page chunk table
    let mut page_widths = Vec::new();
    let mut page_heights = Vec::new();
    let mut page_ordinals = Vec::new();
    let mut page_ids = Vec::new();

    let mut blocks = Containers::new("page");
    let mut paragraphs = Containers::new("block");
    let mut lines = Containers::new("paragraph");

    // atom table
    let mut atom_lefts = Vec::new();
    let mut atom_tops = Vec::new();
    let mut atom_widths = Vec::new();
    let mut atom_heights = Vec::new();
    let mut atom_texts = Vec::new();
    let mut atom_confs = Vec::new();
    let mut atom_ordinals = Vec::new();
    let mut atom_ids = Vec::new();
    let mut atom_documents = Vec::new();

    let mut document_atoms = Junction::default();
    let mut page_atoms = Junction::default();
    let mut block_atoms = Junction::default();
    let mut paragraph_atoms = Junction::default();
    let mut line_atoms = Junction::default();

    // cumulative counts per level, document-wide
    let (mut n_pages, mut n_blocks, mut n_pars, mut n_lines, mut n_words) = (0, 0, 0, 0, 0);
    // most recent container id per level
    let mut current: [Option<Value>; 4] = [None, None, None, None];

    for (position, rec) in ordered.into_iter().enumerate() {
        match rec.level {
            1 => {
                n_pages += 1;
                let id = coord_id(document_id, (Some(n_pages), None, None, None, None));
                page_widths.push(Value::Int(rec.width));
                page_heights.push(Value::Int(rec.height));
                page_ordinals.push(Value::Int(n_pages));
                page_ids.push(id.clone());
                current = [Some(id), None, None, None];
            }
            2 => {
                n_blocks += 1;
                let id =
                    coord_id(document_id, (Some(n_pages), Some(n_blocks), None, None, None));
                let parent = parent_of(&current[0], position, "block", "page")?;
                blocks.push(rec, parent, n_blocks, &id);
                current[1] = Some(id);
                current[2] = None;
                current[3] = None;
            }
            3 => {
                n_pars += 1;
                let id = coord_id(
                    document_id,
                    (Some(n_pages), Some(n_blocks), Some(n_pars), None, None),
                );
                let parent = parent_of(&current[1], position, "paragraph", "block")?;
                paragraphs.push(rec, parent, n_pars, &id);
                current[2] = Some(id);
                current[3] = None;
            }
            4 => {
                n_lines += 1;
                let id = coord_id(
                    document_id,
                    (
                        Some(n_pages),
                        Some(n_blocks),
                        Some(n_pars),
                        Some(n_lines),
                        None,
                    ),
                );
                let parent = parent_of(&current[2], position, "line", "paragraph")?;
                lines.push(rec, parent, n_lines, &id);
                current[3] = Some(id);
            }
            5 => {
                n_words += 1;
                let id = coord_id(
                    document_id,
                    (
                        Some(n_pages),
                        Some(n_blocks),
                        Some(n_pars),
                        Some(n_lines),
                        Some(n_words),
                    ),
                );
                atom_lefts.push(Value::Int(rec.left));
                atom_tops.push(Value::Int(rec.top));
                atom_widths.push(Value::Int(rec.width));
                atom_heights.push(Value::Int(rec.height));
                atom_texts.push(Value::from(rec.text.as_str()));
                atom_confs.push(Value::Float(rec.conf));
                atom_ordinals.push(Value::Int(n_words));
                atom_documents.push(document.clone());

                document_atoms.push(&document, &id);
                page_atoms.push(&parent_of(&current[0], position, "word", "page")?, &id);
                block_atoms.push(&parent_of(&current[1], position, "word", "block")?, &id);
                paragraph_atoms
                    .push(&parent_of(&current[2], position, "word", "paragraph")?, &id);
                line_atoms.push(&parent_of(&current[3], position, "word", "line")?, &id);
                atom_ids.push(id);
            }
            level => {
                return Err(Error::MalformedRecord {
                    line: position + 1,
                    reason: format!("level {level} out of range"),
                });
            }
        }
    }

    let atoms = Table::from_columns([
        ("left", Column::from(atom_lefts)),
        ("top", Column::from(atom_tops)),
        ("width", Column::from(atom_widths)),
        ("height", Column::from(atom_heights)),
        (col::TEXT, Column::from(atom_texts)),
        ("confidence", Column::from(atom_confs)),
        (col::ORDINAL, Column::from(atom_ordinals)),
        (col::ID, Column::from(atom_ids)),
        ("document", Column::from(atom_documents)),
    ])?;
    let mut corpus = Corpus::new(atoms)?;

    let document_chunks =
        Table::from_columns([(col::ID, Column::from(vec![document.clone()]))])?;
    register(&mut corpus, "document", document_chunks, document_atoms)?;

    let page_chunks = Table::from_columns([
        ("document", Column::from(vec![document; page_ids.len()])),
        ("width", Column::from(page_widths)),
        ("height", Column::from(page_heights)),
        (col::ORDINAL, Column::from(page_ordinals)),
        (col::ID, Column::from(page_ids)),
    ])?;
    register(&mut corpus, "page", page_chunks, page_atoms)?;
    register(&mut corpus, "block", blocks.into_table()?, block_atoms)?;
    register(&mut corpus, "paragraph", paragraphs.into_table()?, paragraph_atoms)?;
    register(&mut corpus, "line", lines.into_table()?, line_atoms)?;

    log::debug!(
        "tesseract '{}': {} word(s) across {} page(s)",
        document_id,
        n_words,
        n_pages
    );

    Ok(corpus)
}

fn parent_of(current: &Option<Value>, position: usize, child: &str, parent: &str) -> Result<Value> {
    current.clone().ok_or_else(|| Error::MalformedRecord {
        line: position + 1,
        reason: format!("{child} row before any {parent} row"),
    })
}

fn register(corpus: &mut Corpus, name: &str, chunks: Table, members: Junction) -> Result<()> {
    let set = ChunkSet::new(corpus, chunks, members.into_table()?)?;
    corpus.set_chunk(name, &set)
}
