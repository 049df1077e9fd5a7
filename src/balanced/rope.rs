//! Persistent character rope with line indexing.

use std::fmt::Display;

use super::{Retain, Tree};
use crate::{Error, Result};

// -------------------------------------------------------------------------------------------------

/// Max number of characters which get spliced into an existing chunk. Larger chunks are split.
pub const CHUNK_SIZE: usize = 8;

// -------------------------------------------------------------------------------------------------

/// Rope payload: a text chunk plus character and newline counts of the whole subtree.
#[derive(Clone, Debug)]
pub struct Chunk {
    text: String,
    chars: usize,
    length: usize,
    newlines: usize,
}

impl Chunk {
    fn new(text: String) -> Self {
        let chars = text.chars().count();
        let newlines = text.matches('\n').count();
        Self {
            text,
            chars,
            length: chars,
            newlines,
        }
    }

    fn build(text: String, left: Tree<Chunk>, right: Tree<Chunk>) -> Tree<Chunk> {
        Self::new(text).retain(left, right)
    }

    /// The chunk's own text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Retain for Chunk {
    fn retain(&self, left: Tree<Self>, right: Tree<Self>) -> Tree<Self> {
        let own_newlines = self.text.matches('\n').count();
        let chunk = Chunk {
            text: self.text.clone(),
            chars: self.chars,
            length: self.chars + length(&left) + length(&right),
            newlines: own_newlines + newlines(&left) + newlines(&right),
        };
        Tree::node(chunk, left, right)
    }
}

fn length(tree: &Tree<Chunk>) -> usize {
    tree.get().map_or(0, |node| node.payload().length)
}

fn newlines(tree: &Tree<Chunk>) -> usize {
    tree.get().map_or(0, |node| node.payload().newlines)
}

/// Byte offset of the given char offset in `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| offset)
}

/// Split text into pieces of at most `CHUNK_SIZE` chars.
fn split_chunks(text: &str) -> Vec<String> {
    let chars = text.chars().collect::<Vec<_>>();
    chars
        .chunks(CHUNK_SIZE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

// -------------------------------------------------------------------------------------------------

/// A persistent text buffer, stored as balanced tree of small text chunks.
///
/// All positions are character (not byte) offsets. Edits return a new rope and leave the
/// original untouched.
#[derive(Clone, Debug, Default)]
pub struct Rope {
    root: Tree<Chunk>,
}

impl Rope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of characters in the rope.
    pub fn len(&self) -> usize {
        length(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of newline characters in the rope.
    pub fn newlines(&self) -> usize {
        newlines(&self.root)
    }

    /// Number of lines in the rope. An empty rope has a single, empty line.
    pub fn lines(&self) -> usize {
        self.newlines() + 1
    }

    /// Access to the underlying balanced tree.
    pub fn tree(&self) -> &Tree<Chunk> {
        &self.root
    }

    /// Iterate over all text chunks in order.
    pub fn chunks(&self) -> impl Iterator<Item = &str> {
        self.root.iter().map(Chunk::text)
    }

    /// Character at the given position, if any.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        let mut tree = &self.root;
        let mut pos = pos;
        while let Some(node) = tree.get() {
            let chunk = node.payload();
            let left_len = length(node.left());
            if pos < left_len {
                tree = node.left();
            } else if pos < left_len + chunk.chars {
                return chunk.text.chars().nth(pos - left_len);
            } else {
                pos -= left_len + chunk.chars;
                tree = node.right();
            }
        }
        None
    }

    /// Insert text at the given char position.
    pub fn insert(&self, pos: usize, text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(self.clone());
        }
        if pos > self.len() {
            return Err(Error::index_range(pos, self.len()));
        }
        let mut root = self.root.clone();
        let mut pos = pos;
        for piece in split_chunks(text) {
            let count = piece.chars().count();
            root = Self::insert_at(&root, pos, &piece);
            pos += count;
        }
        Ok(Self { root })
    }

    fn insert_at(tree: &Tree<Chunk>, pos: usize, text: &str) -> Tree<Chunk> {
        let Some(node) = tree.get() else {
            return Chunk::build(text.to_string(), Tree::empty(), Tree::empty());
        };
        let chunk = node.payload();
        let (left, right) = (node.left(), node.right());
        let left_len = length(left);
        if pos < left_len {
            let left = Self::insert_at(left, pos, text);
            return Chunk::build(chunk.text.clone(), left, right.clone()).rebalance();
        }
        let offset = pos - left_len;
        if offset > chunk.chars {
            let right = Self::insert_at(right, offset - chunk.chars, text);
            return Chunk::build(chunk.text.clone(), left.clone(), right).rebalance();
        }
        let split = byte_offset(&chunk.text, offset);
        if chunk.chars + text.chars().count() <= CHUNK_SIZE {
            let mut joined = String::with_capacity(chunk.text.len() + text.len());
            joined.push_str(&chunk.text[..split]);
            joined.push_str(text);
            joined.push_str(&chunk.text[split..]);
            Chunk::build(joined, left.clone(), right.clone()).rebalance()
        } else {
            // split the chunk: remainders move into the neighbours, text becomes the middle
            let (head, tail) = chunk.text.split_at(split);
            let left = if head.is_empty() {
                left.clone()
            } else {
                Self::insert_at(left, left_len, head)
            };
            let right = if tail.is_empty() {
                right.clone()
            } else {
                Self::insert_at(right, 0, tail)
            };
            Chunk::build(text.to_string(), left, right).rebalance()
        }
    }

    /// Remove the char range `[start, stop)`.
    pub fn erase(&self, start: usize, stop: usize) -> Result<Self> {
        self.check_range(start, stop)?;
        if start == stop {
            return Ok(self.clone());
        }
        let root = Self::erase_in(&self.root, start, stop);
        Ok(Self { root })
    }

    fn erase_in(tree: &Tree<Chunk>, start: usize, stop: usize) -> Tree<Chunk> {
        let Some(node) = tree.get() else {
            return tree.clone();
        };
        let chunk = node.payload();
        if stop == 0 || start >= chunk.length {
            return tree.clone();
        }
        let left_len = length(node.left());
        let right_start = left_len + chunk.chars;
        let left = if start < left_len {
            Self::erase_in(node.left(), start, stop.min(left_len))
        } else {
            node.left().clone()
        };
        let right = if stop > right_start {
            Self::erase_in(
                node.right(),
                start.saturating_sub(right_start),
                stop - right_start,
            )
        } else {
            node.right().clone()
        };
        let from = start.saturating_sub(left_len).min(chunk.chars);
        let to = stop.saturating_sub(left_len).min(chunk.chars);
        if from == 0 && to == chunk.chars {
            Tree::pluck(&left, &right)
        } else if from == to {
            Tree::join(left, chunk, right)
        } else {
            let mut text = String::with_capacity(chunk.text.len());
            text.push_str(&chunk.text[..byte_offset(&chunk.text, from)]);
            text.push_str(&chunk.text[byte_offset(&chunk.text, to)..]);
            Tree::join(left, &Chunk::new(text), right)
        }
    }

    /// 0-based line number of the line containing the given char position.
    pub fn row(&self, pos: usize) -> Result<usize> {
        if pos > self.len() {
            return Err(Error::index_range(pos, self.len()));
        }
        let mut tree = &self.root;
        let mut pos = pos;
        let mut row = 0;
        while let Some(node) = tree.get() {
            let chunk = node.payload();
            let left_len = length(node.left());
            if pos < left_len {
                tree = node.left();
            } else if pos < left_len + chunk.chars {
                let prefix = &chunk.text[..byte_offset(&chunk.text, pos - left_len)];
                return Ok(row + newlines(node.left()) + prefix.matches('\n').count());
            } else {
                row += chunk.newlines - newlines(node.right());
                pos -= left_len + chunk.chars;
                tree = node.right();
            }
        }
        Ok(row)
    }

    /// Char position of the first character of the given 0-based line.
    pub fn rowpos(&self, row: usize) -> Result<usize> {
        if row > self.newlines() {
            return Err(Error::index_range(row, self.newlines()));
        }
        if row == 0 {
            return Ok(0);
        }
        // find the position right after the row'th newline
        let mut tree = &self.root;
        let mut row = row;
        let mut offset = 0;
        while let Some(node) = tree.get() {
            let chunk = node.payload();
            let left_newlines = newlines(node.left());
            let own_newlines = chunk.newlines - left_newlines - newlines(node.right());
            let left_len = length(node.left());
            if row <= left_newlines {
                tree = node.left();
            } else if row <= left_newlines + own_newlines {
                let nth = row - left_newlines;
                let index = chunk
                    .text
                    .chars()
                    .enumerate()
                    .filter(|(_, c)| *c == '\n')
                    .nth(nth - 1)
                    .map_or(chunk.chars, |(index, _)| index);
                return Ok(offset + left_len + index + 1);
            } else {
                row -= left_newlines + own_newlines;
                offset += left_len + chunk.chars;
                tree = node.right();
            }
        }
        Ok(offset)
    }

    /// In-order chunk fragments which cover the char range `[start, stop)`.
    pub fn segments(&self, start: usize, stop: usize) -> Result<Vec<&str>> {
        fn collect<'a>(tree: &'a Tree<Chunk>, start: usize, stop: usize, out: &mut Vec<&'a str>) {
            let Some(node) = tree.get() else {
                return;
            };
            let chunk = node.payload();
            if stop == 0 || start >= chunk.length {
                return;
            }
            let left_len = length(node.left());
            let right_start = left_len + chunk.chars;
            if start < left_len {
                collect(node.left(), start, stop.min(left_len), out);
            }
            let from = start.saturating_sub(left_len).min(chunk.chars);
            let to = stop.saturating_sub(left_len).min(chunk.chars);
            if from < to {
                out.push(
                    &chunk.text[byte_offset(&chunk.text, from)..byte_offset(&chunk.text, to)],
                );
            }
            if stop > right_start {
                collect(
                    node.right(),
                    start.saturating_sub(right_start),
                    stop - right_start,
                    out,
                );
            }
        }
        self.check_range(start, stop)?;
        let mut segments = Vec::new();
        collect(&self.root, start, stop, &mut segments);
        Ok(segments)
    }

    fn check_range(&self, start: usize, stop: usize) -> Result<()> {
        if stop > self.len() {
            Err(Error::index_range(stop, self.len()))
        } else if start > stop {
            Err(Error::index_range(start, stop))
        } else {
            Ok(())
        }
    }
}

impl From<&str> for Rope {
    fn from(text: &str) -> Self {
        let root = Tree::from_payloads(split_chunks(text).into_iter().map(Chunk::new));
        Self { root }
    }
}

impl Display for Rope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn char_slice(text: &str, start: usize, stop: usize) -> String {
        text.chars().skip(start).take(stop - start).collect()
    }

    #[test]
    fn insert() {
        let rope = Rope::new();
        assert!(rope.is_empty());
        let rope = rope.insert(0, "hello").unwrap();
        let rope = rope.insert(5, " world").unwrap();
        let rope = rope.insert(5, ",").unwrap();
        assert_eq!(rope.to_string(), "hello, world");
        assert_eq!(rope.len(), 12);
        // empty text is a no-op
        assert_eq!(rope.insert(3, "").unwrap().to_string(), "hello, world");
        // chunks never grow beyond the chunk size
        assert!(rope.chunks().all(|chunk| chunk.chars().count() <= CHUNK_SIZE));
        assert!(rope.tree().is_balanced());
        // out of range
        assert_eq!(
            rope.insert(13, "x").unwrap_err(),
            Error::IndexRange { index: 13, len: 12 }
        );
    }

    #[test]
    fn persistence() {
        let rope = Rope::from("abc");
        let edited = rope.insert(1, "xyz").unwrap().erase(0, 1).unwrap();
        assert_eq!(rope.to_string(), "abc");
        assert_eq!(edited.to_string(), "xyzbc");
    }

    #[test]
    fn erase() {
        let rope = Rope::from("the quick brown fox jumps over the lazy dog");
        assert_eq!(
            rope.erase(4, 10).unwrap().to_string(),
            "the brown fox jumps over the lazy dog"
        );
        assert_eq!(rope.erase(0, rope.len()).unwrap().to_string(), "");
        assert_eq!(rope.erase(5, 5).unwrap().to_string(), rope.to_string());
        assert!(rope.erase(5, 4).is_err());
        assert!(rope.erase(0, rope.len() + 1).is_err());
        assert!(rope.erase(3, 40).unwrap().tree().is_balanced());
    }

    #[test]
    fn unicode() {
        let rope = Rope::from("äöü").insert(1, "ß€").unwrap();
        assert_eq!(rope.to_string(), "äß€öü");
        assert_eq!(rope.len(), 5);
        assert_eq!(rope.char_at(2), Some('€'));
        assert_eq!(rope.erase(1, 3).unwrap().to_string(), "äöü");
    }

    #[test]
    fn rows() {
        let rope = Rope::from("first\nsecond line\n\nlast one");
        assert_eq!(rope.lines(), 4);
        assert_eq!(rope.row(0).unwrap(), 0);
        assert_eq!(rope.row(5).unwrap(), 0);
        assert_eq!(rope.row(6).unwrap(), 1);
        assert_eq!(rope.row(18).unwrap(), 2);
        assert_eq!(rope.row(19).unwrap(), 3);
        assert_eq!(rope.row(rope.len()).unwrap(), 3);
        assert_eq!(rope.rowpos(0).unwrap(), 0);
        assert_eq!(rope.rowpos(1).unwrap(), 6);
        assert_eq!(rope.rowpos(2).unwrap(), 18);
        assert_eq!(rope.rowpos(3).unwrap(), 19);
        assert!(rope.rowpos(4).is_err());
        assert!(rope.row(rope.len() + 1).is_err());
    }

    #[test]
    fn segments() {
        let text = "0123456789abcdefghijklmnopqrstuvwxyz";
        let rope = Rope::from(text);
        assert_eq!(rope.segments(3, 21).unwrap().concat(), &text[3..21]);
        assert_eq!(rope.segments(0, rope.len()).unwrap().concat(), text);
        assert!(rope.segments(4, 4).unwrap().is_empty());
        assert!(rope.segments(4, 3).is_err());
    }

    #[test]
    fn random_edits() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
        let alphabet = ['a', 'b', 'c', '\n', 'x', 'ö', ' '];
        let mut rope = Rope::new();
        let mut reference = String::new();
        for _ in 0..2000 {
            let len = reference.chars().count();
            if len > 0 && rng.random_bool(0.4) {
                let start = rng.random_range(0..=len);
                let stop = rng.random_range(start..=len.min(start + 20));
                rope = rope.erase(start, stop).unwrap();
                reference = format!(
                    "{}{}",
                    char_slice(&reference, 0, start),
                    char_slice(&reference, stop, len)
                );
            } else {
                let pos = rng.random_range(0..=len);
                let count = rng.random_range(1..20);
                let text = (0..count)
                    .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                    .collect::<String>();
                rope = rope.insert(pos, &text).unwrap();
                reference = format!(
                    "{}{}{}",
                    char_slice(&reference, 0, pos),
                    text,
                    char_slice(&reference, pos, len)
                );
            }
            assert!(rope.tree().is_balanced());
        }
        assert_eq!(rope.segments(0, rope.len()).unwrap().concat(), reference);
        assert_eq!(rope.len(), reference.chars().count());
        assert_eq!(rope.newlines(), reference.matches('\n').count());

        // line index inverse
        for pos in 0..rope.len() {
            let row = rope.row(pos).unwrap();
            assert!(rope.rowpos(row).unwrap() <= pos);
            if row < rope.newlines() {
                assert!(pos < rope.rowpos(row + 1).unwrap());
            }
        }
    }
}
