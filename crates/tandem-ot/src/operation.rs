//! Text operations: retain/insert/delete step sequences and their algebra.
//!
//! An operation describes an edit as an imaginary cursor walking over the
//! whole input document. Each step either skips characters (`Retain`),
//! inserts new text at the cursor (`Insert`) or removes characters
//! (`Delete`). Lengths are counted in chars (Unicode scalar values).
//!
//! The algebra provides:
//! - `apply`: run the operation over a document
//! - `invert`: build the operation that undoes it
//! - `compose`: fold two sequential operations into one
//! - `transform`: rebase two concurrent operations onto each other

use std::cmp::Ordering;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::OtError;

/// A single step of a [`TextOperation`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Skip this many chars unchanged.
    Retain(usize),
    /// Insert text at the cursor.
    Insert(SmolStr),
    /// Remove this many chars from the input.
    Delete(usize),
}

impl Op {
    pub fn is_retain(&self) -> bool {
        matches!(self, Op::Retain(_))
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Op::Insert(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Op::Delete(_))
    }

    /// Number of chars covered by the step.
    ///
    /// For inserts this is the inserted text's char count.
    pub fn len(&self) -> usize {
        match self {
            Op::Retain(n) | Op::Delete(n) => *n,
            Op::Insert(text) => char_len(text),
        }
    }

    /// Whether the step covers no chars (never true for a normalized step).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Retain(n) => write!(f, "retain {n}"),
            Op::Insert(text) => write!(f, "insert {:?}", text.as_str()),
            Op::Delete(n) => write!(f, "delete {n}"),
        }
    }
}

/// An edit of a plain-text document, as a normalized sequence of steps.
///
/// Normalization is enforced by the builder: adjacent steps of the same kind
/// are merged, zero-length steps are dropped, and an insert is always placed
/// before an adjacent delete. Two operations with the same effect therefore
/// compare equal.
///
/// ```
/// use tandem_ot::TextOperation;
///
/// let op = TextOperation::new().retain(5).insert(" world");
/// assert_eq!(op.apply("hello").unwrap(), "hello world");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextOperation {
    ops: Vec<Op>,
    /// Chars consumed from the input.
    base_len: usize,
    /// Chars produced in the output.
    target_len: usize,
}

impl TextOperation {
    /// Create an empty operation (applies only to the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an operation from arbitrary steps, normalizing as it goes.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut operation = Self::new();
        for op in ops {
            operation.push(op);
        }
        operation
    }

    /// Skip `n` chars. No-op at zero.
    pub fn retain(mut self, n: usize) -> Self {
        self.push(Op::Retain(n));
        self
    }

    /// Insert `text` at the cursor. No-op for empty text.
    pub fn insert(mut self, text: &str) -> Self {
        self.push(Op::Insert(text.into()));
        self
    }

    /// Delete `n` chars. No-op at zero.
    pub fn delete(mut self, n: usize) -> Self {
        self.push(Op::Delete(n));
        self
    }

    /// Delete as many chars as `text` has.
    pub fn delete_str(self, text: &str) -> Self {
        self.delete(char_len(text))
    }

    /// Append a step, merging and reordering to keep the sequence normalized.
    ///
    /// # Panics
    ///
    /// Panics if the operation's length would overflow `usize`. Use
    /// [`TextOperation::try_push`] for steps from untrusted input.
    pub fn push(&mut self, op: Op) {
        if let Err(err) = self.try_push(op) {
            panic!("{err}");
        }
    }

    /// Append a step like [`TextOperation::push`], failing with
    /// `MalformedStep` instead of overflowing the operation's length.
    ///
    /// The operation is left unchanged on error.
    pub fn try_push(&mut self, op: Op) -> Result<(), OtError> {
        let overflow = || OtError::MalformedStep(format!("{op} overflows the operation length"));
        match &op {
            Op::Retain(0) | Op::Delete(0) => {}
            Op::Insert(text) if text.is_empty() => {}
            Op::Retain(n) => {
                let base_len = self.base_len.checked_add(*n).ok_or_else(overflow)?;
                let target_len = self.target_len.checked_add(*n).ok_or_else(overflow)?;
                (self.base_len, self.target_len) = (base_len, target_len);
                // A merged step never exceeds the total it is part of.
                match self.ops.last_mut() {
                    Some(Op::Retain(last)) => *last += n,
                    _ => self.ops.push(op),
                }
            }
            Op::Delete(n) => {
                self.base_len = self.base_len.checked_add(*n).ok_or_else(overflow)?;
                match self.ops.last_mut() {
                    Some(Op::Delete(last)) => *last += n,
                    _ => self.ops.push(op),
                }
            }
            Op::Insert(text) => {
                self.target_len = self
                    .target_len
                    .checked_add(char_len(text))
                    .ok_or_else(overflow)?;
                // Inserts go before a trailing delete.
                let at = match self.ops.last() {
                    Some(Op::Delete(_)) => self.ops.len() - 1,
                    _ => self.ops.len(),
                };
                if at > 0 {
                    if let Op::Insert(prev) = &mut self.ops[at - 1] {
                        let mut joined = String::with_capacity(prev.len() + text.len());
                        joined.push_str(prev);
                        joined.push_str(text);
                        *prev = joined.into();
                        return Ok(());
                    }
                }
                self.ops.insert(at, op);
            }
        }
        Ok(())
    }

    /// The normalized steps.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Length in chars of every document this operation applies to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length in chars of every document this operation produces.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Whether applying the operation leaves any document unchanged.
    pub fn is_noop(&self) -> bool {
        matches!(self.ops.as_slice(), [] | [Op::Retain(_)])
    }

    /// Apply the operation to `input`, returning the edited document.
    ///
    /// Fails without producing partial output if `input` is not exactly
    /// `base_len` chars long.
    pub fn apply(&self, input: &str) -> Result<String, OtError> {
        let len = char_len(input);
        if len != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual: len,
            });
        }

        let mut output = String::with_capacity(input.len());
        let mut chars = input.chars();
        let mut position = 0;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    if position + n > len {
                        return Err(OtError::OutOfRange {
                            position: position + n,
                            len,
                        });
                    }
                    output.extend(chars.by_ref().take(*n));
                    position += n;
                }
                Op::Insert(text) => output.push_str(text),
                Op::Delete(n) => {
                    if position + n > len {
                        return Err(OtError::OutOfRange {
                            position: position + n,
                            len,
                        });
                    }
                    chars.by_ref().take(*n).for_each(drop);
                    position += n;
                }
            }
        }

        if position != len {
            return Err(OtError::OutOfRange { position, len });
        }
        Ok(output)
    }

    /// Build the operation that reverts this one.
    ///
    /// `input` must be the document this operation was built against: the
    /// text of deleted spans is recovered from it.
    pub fn invert(&self, input: &str) -> TextOperation {
        let mut inverse = TextOperation::new();
        let mut rest = input;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    inverse.push(Op::Retain(*n));
                    rest = split_at_char(rest, *n).1;
                }
                Op::Insert(text) => inverse.push(Op::Delete(char_len(text))),
                Op::Delete(n) => {
                    let (removed, tail) = split_at_char(rest, *n);
                    inverse.push(Op::Insert(removed.into()));
                    rest = tail;
                }
            }
        }
        inverse
    }

    /// Merge this operation with one applied directly after it.
    ///
    /// For every document `s`:
    /// `a.compose(&b)?.apply(s) == b.apply(&a.apply(s)?)`.
    pub fn compose(&self, other: &TextOperation) -> Result<TextOperation, OtError> {
        if self.target_len != other.base_len {
            return Err(OtError::IncompatibleLengths {
                first_target: self.target_len,
                second_base: other.base_len,
            });
        }

        let mut composed = TextOperation::new();
        let mut steps_a = self.ops.iter().cloned();
        let mut steps_b = other.ops.iter().cloned();
        let mut op_a = steps_a.next();
        let mut op_b = steps_b.next();

        loop {
            match (op_a, op_b) {
                (None, None) => break,
                // Deletes in the first operation are final.
                (Some(Op::Delete(n)), next_b) => {
                    composed.push(Op::Delete(n));
                    op_a = steps_a.next();
                    op_b = next_b;
                }
                // Text inserted by the second operation is untouched by the first.
                (next_a, Some(Op::Insert(text))) => {
                    composed.push(Op::Insert(text));
                    op_a = next_a;
                    op_b = steps_b.next();
                }
                (None, Some(_)) => {
                    return Err(OtError::IncompatibleOperations(
                        "first operation is too short".into(),
                    ));
                }
                (Some(_), None) => {
                    return Err(OtError::IncompatibleOperations(
                        "first operation is too long".into(),
                    ));
                }
                (Some(Op::Retain(x)), Some(Op::Retain(y))) => {
                    let n = x.min(y);
                    composed.push(Op::Retain(n));
                    op_a = remainder(x, n, Op::Retain, &mut steps_a);
                    op_b = remainder(y, n, Op::Retain, &mut steps_b);
                }
                (Some(Op::Insert(text)), Some(Op::Delete(y))) => {
                    let len = char_len(&text);
                    match len.cmp(&y) {
                        Ordering::Greater => {
                            op_a = Some(Op::Insert(split_at_char(&text, y).1.into()));
                            op_b = steps_b.next();
                        }
                        Ordering::Equal => {
                            op_a = steps_a.next();
                            op_b = steps_b.next();
                        }
                        Ordering::Less => {
                            op_a = steps_a.next();
                            op_b = Some(Op::Delete(y - len));
                        }
                    }
                }
                (Some(Op::Insert(text)), Some(Op::Retain(y))) => {
                    let len = char_len(&text);
                    match len.cmp(&y) {
                        Ordering::Greater => {
                            let (head, tail) = split_at_char(&text, y);
                            composed.push(Op::Insert(head.into()));
                            op_a = Some(Op::Insert(tail.into()));
                            op_b = steps_b.next();
                        }
                        Ordering::Equal => {
                            composed.push(Op::Insert(text));
                            op_a = steps_a.next();
                            op_b = steps_b.next();
                        }
                        Ordering::Less => {
                            composed.push(Op::Insert(text));
                            op_a = steps_a.next();
                            op_b = Some(Op::Retain(y - len));
                        }
                    }
                }
                (Some(Op::Retain(x)), Some(Op::Delete(y))) => {
                    let n = x.min(y);
                    composed.push(Op::Delete(n));
                    op_a = remainder(x, n, Op::Retain, &mut steps_a);
                    op_b = remainder(y, n, Op::Delete, &mut steps_b);
                }
            }
        }

        Ok(composed)
    }

    /// Rebase two concurrent operations against each other.
    ///
    /// Both must share a base document. Returns `(a', b')` such that
    /// applying `a` then `b'` gives the same document as applying `b` then
    /// `a'`. When both operations insert at the same position, `a`'s text
    /// ends up first.
    pub fn transform(
        a: &TextOperation,
        b: &TextOperation,
    ) -> Result<(TextOperation, TextOperation), OtError> {
        if a.base_len != b.base_len {
            return Err(OtError::LengthMismatch {
                expected: a.base_len,
                actual: b.base_len,
            });
        }

        let mut a_prime = TextOperation::new();
        let mut b_prime = TextOperation::new();
        let mut steps_a = a.ops.iter().cloned();
        let mut steps_b = b.ops.iter().cloned();
        let mut op_a = steps_a.next();
        let mut op_b = steps_b.next();

        loop {
            match (op_a, op_b) {
                (None, None) => break,
                (Some(Op::Insert(text)), next_b) => {
                    b_prime.push(Op::Retain(char_len(&text)));
                    a_prime.push(Op::Insert(text));
                    op_a = steps_a.next();
                    op_b = next_b;
                }
                (next_a, Some(Op::Insert(text))) => {
                    a_prime.push(Op::Retain(char_len(&text)));
                    b_prime.push(Op::Insert(text));
                    op_a = next_a;
                    op_b = steps_b.next();
                }
                (None, Some(_)) => {
                    return Err(OtError::IncompatibleOperations(
                        "first operation is too short".into(),
                    ));
                }
                (Some(_), None) => {
                    return Err(OtError::IncompatibleOperations(
                        "first operation is too long".into(),
                    ));
                }
                (Some(Op::Retain(x)), Some(Op::Retain(y))) => {
                    let n = x.min(y);
                    a_prime.push(Op::Retain(n));
                    b_prime.push(Op::Retain(n));
                    op_a = remainder(x, n, Op::Retain, &mut steps_a);
                    op_b = remainder(y, n, Op::Retain, &mut steps_b);
                }
                // Both sides removed the same text; neither prime has to.
                (Some(Op::Delete(x)), Some(Op::Delete(y))) => {
                    let n = x.min(y);
                    op_a = remainder(x, n, Op::Delete, &mut steps_a);
                    op_b = remainder(y, n, Op::Delete, &mut steps_b);
                }
                (Some(Op::Delete(x)), Some(Op::Retain(y))) => {
                    let n = x.min(y);
                    a_prime.push(Op::Delete(n));
                    op_a = remainder(x, n, Op::Delete, &mut steps_a);
                    op_b = remainder(y, n, Op::Retain, &mut steps_b);
                }
                (Some(Op::Retain(x)), Some(Op::Delete(y))) => {
                    let n = x.min(y);
                    b_prime.push(Op::Delete(n));
                    op_a = remainder(x, n, Op::Retain, &mut steps_a);
                    op_b = remainder(y, n, Op::Delete, &mut steps_b);
                }
            }
        }

        Ok((a_prime, b_prime))
    }

    /// This operation rebased onto a concurrent `other`.
    pub fn follow(&self, other: &TextOperation) -> Result<TextOperation, OtError> {
        Ok(Self::transform(self, other)?.0)
    }

    /// The wire form: positive ints retain, negative ints delete, strings insert.
    pub fn to_wire(&self) -> Vec<Value> {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Retain(n) => Value::from(*n as u64),
                Op::Delete(n) => Value::from(-(*n as i64)),
                Op::Insert(text) => Value::from(text.as_str()),
            })
            .collect()
    }

    /// Rebuild an operation from wire elements.
    ///
    /// Every element goes through the builder so untrusted input comes out
    /// normalized.
    pub fn from_wire(steps: &[Value]) -> Result<Self, OtError> {
        let mut operation = Self::new();
        for step in steps {
            match step {
                Value::String(text) => operation.try_push(Op::Insert(text.into()))?,
                Value::Number(n) => {
                    let malformed = || OtError::MalformedStep(step.to_string());
                    let n = n.as_i64().ok_or_else(malformed)?;
                    let count = usize::try_from(n.unsigned_abs()).map_err(|_| malformed())?;
                    match n.signum() {
                        1 => operation.try_push(Op::Retain(count))?,
                        -1 => operation.try_push(Op::Delete(count))?,
                        _ => return Err(malformed()),
                    }
                }
                other => {
                    tracing::debug!(step = %other, "rejecting malformed wire step");
                    return Err(OtError::MalformedStep(other.to_string()));
                }
            }
        }
        Ok(operation)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> String {
        Value::Array(self.to_wire()).to_string()
    }

    /// Parse the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, OtError> {
        let steps: Vec<Value> =
            serde_json::from_str(json).map_err(|e| OtError::MalformedStep(e.to_string()))?;
        Self::from_wire(&steps)
    }
}

impl fmt::Display for TextOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("noop");
        }
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl Serialize for TextOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let steps = Vec::<Value>::deserialize(deserializer)?;
        Self::from_wire(&steps).map_err(D::Error::custom)
    }
}

/// What is left of a step after `used` of its `len` chars were consumed.
fn remainder(
    len: usize,
    used: usize,
    kind: fn(usize) -> Op,
    steps: &mut impl Iterator<Item = Op>,
) -> Option<Op> {
    if len > used {
        Some(kind(len - used))
    } else {
        steps.next()
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split after the first `n` chars (or at the end if shorter).
fn split_at_char(text: &str, n: usize) -> (&str, &str) {
    match text.char_indices().nth(n) {
        Some((idx, _)) => text.split_at(idx),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_merges_adjacent_steps() {
        assert_eq!(
            TextOperation::new().retain(2).retain(3),
            TextOperation::new().retain(5)
        );
        assert_eq!(
            TextOperation::new().insert("a").insert("b"),
            TextOperation::new().insert("ab")
        );
        assert_eq!(
            TextOperation::new().delete(1).delete_str("xy"),
            TextOperation::new().delete(3)
        );
    }

    #[test]
    fn test_builder_skips_empty_steps() {
        let op = TextOperation::new().retain(0).insert("").delete(0);
        assert!(op.ops().is_empty());
        assert_eq!(op.base_len(), 0);
        assert_eq!(op.target_len(), 0);
    }

    #[test]
    fn test_insert_is_normalized_before_delete() {
        let a = TextOperation::new().retain(1).delete(2).insert("xy");
        let b = TextOperation::new().retain(1).insert("xy").delete(2);
        assert_eq!(a, b);
        assert_eq!(
            a.ops(),
            &[Op::Retain(1), Op::Insert("xy".into()), Op::Delete(2)]
        );

        // An insert after insert+delete joins the earlier insert.
        let c = TextOperation::new().insert("a").delete(1).insert("b");
        assert_eq!(c.ops(), &[Op::Insert("ab".into()), Op::Delete(1)]);
    }

    #[test]
    fn test_lengths() {
        let op = TextOperation::new()
            .retain(3)
            .insert("héllo")
            .delete(2)
            .retain(1);
        assert_eq!(op.base_len(), 6);
        assert_eq!(op.target_len(), 9);
    }

    #[test]
    fn test_is_noop() {
        assert!(TextOperation::new().is_noop());
        assert!(TextOperation::new().retain(7).is_noop());
        assert!(!TextOperation::new().retain(7).insert("x").is_noop());
        assert!(!TextOperation::new().delete(1).is_noop());
    }

    #[test]
    fn test_apply_insert_at_end() {
        let op = TextOperation::new().retain(5).insert(" world");
        assert_eq!(op.apply("hello").unwrap(), "hello world");
    }

    #[test]
    fn test_apply_counts_chars_not_bytes() {
        let op = TextOperation::new().retain(1).delete(1).insert("ü").retain(1);
        assert_eq!(op.apply("aöc").unwrap(), "aüc");
    }

    #[test]
    fn test_apply_length_mismatch() {
        let op = TextOperation::new().retain(5);
        assert_eq!(
            op.apply("hi"),
            Err(OtError::LengthMismatch {
                expected: 5,
                actual: 2
            })
        );
    }

    #[test]
    fn test_invert_insert() {
        let s = "hello";
        let op = TextOperation::new().retain(5).insert(" world");
        let inverse = op.invert(s);
        assert_eq!(inverse, TextOperation::new().retain(5).delete_str(" world"));
        assert_eq!(inverse.apply(&op.apply(s).unwrap()).unwrap(), s);
    }

    #[test]
    fn test_invert_delete_recovers_text() {
        let s = "abcdef";
        let op = TextOperation::new().retain(1).delete(3).insert("X").retain(2);
        let inverse = op.invert(s);
        assert_eq!(
            inverse,
            TextOperation::new().retain(1).insert("bcd").delete(1).retain(2)
        );
        assert_eq!(inverse.apply(&op.apply(s).unwrap()).unwrap(), s);
    }

    #[test]
    fn test_compose_sequential_edits() {
        let s = "hello";
        let a = TextOperation::new().retain(5).insert(" world");
        let b = TextOperation::new().delete(1).insert("J").retain(10);
        let ab = a.compose(&b).unwrap();
        assert_eq!(ab.apply(s).unwrap(), "Jello world");
        assert_eq!(ab.apply(s).unwrap(), b.apply(&a.apply(s).unwrap()).unwrap());
    }

    #[test]
    fn test_compose_insert_then_delete_cancels() {
        let a = TextOperation::new().retain(2).insert("abc").retain(2);
        let b = TextOperation::new().retain(3).delete(2).retain(2);
        let ab = a.compose(&b).unwrap();
        assert_eq!(ab, TextOperation::new().retain(2).insert("a").retain(2));
    }

    #[test]
    fn test_compose_length_mismatch() {
        let a = TextOperation::new().retain(2).insert("x");
        let b = TextOperation::new().retain(2);
        assert_eq!(
            a.compose(&b),
            Err(OtError::IncompatibleLengths {
                first_target: 3,
                second_base: 2
            })
        );
    }

    #[test]
    fn test_transform_delete_vs_insert() {
        let s = "abc";
        let a = TextOperation::new().delete(1).retain(2);
        let b = TextOperation::new().retain(1).insert("X").retain(2);
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        let via_a = b_prime.apply(&a.apply(s).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(s).unwrap()).unwrap();
        assert_eq!(via_a, "Xbc");
        assert_eq!(via_b, "Xbc");
    }

    #[test]
    fn test_transform_concurrent_inserts_prefer_first() {
        let a = TextOperation::new().retain(1).insert("A").retain(1);
        let b = TextOperation::new().retain(1).insert("B").retain(1);
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        assert_eq!(b_prime.apply(&a.apply("xy").unwrap()).unwrap(), "xABy");
        assert_eq!(a_prime.apply(&b.apply("xy").unwrap()).unwrap(), "xABy");
        assert_eq!(a.follow(&b).unwrap(), a_prime);
    }

    #[test]
    fn test_transform_overlapping_deletes() {
        let s = "abcdef";
        let a = TextOperation::new().retain(1).delete(3).retain(2);
        let b = TextOperation::new().retain(2).delete(3).retain(1);
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        assert_eq!(a_prime, TextOperation::new().retain(1).delete(1).retain(1));
        assert_eq!(b_prime, TextOperation::new().retain(1).delete(1).retain(1));
        assert_eq!(b_prime.apply(&a.apply(s).unwrap()).unwrap(), "af");
        assert_eq!(a_prime.apply(&b.apply(s).unwrap()).unwrap(), "af");
    }

    #[test]
    fn test_transform_base_length_mismatch() {
        let a = TextOperation::new().retain(2);
        let b = TextOperation::new().retain(3);
        assert!(matches!(
            TextOperation::transform(&a, &b),
            Err(OtError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_wire_format() {
        let op = TextOperation::new()
            .retain(3)
            .insert("hi")
            .delete(2)
            .retain(1);
        insta::assert_snapshot!(op.to_json(), @r#"[3,"hi",-2,1]"#);
        assert_eq!(TextOperation::from_json(&op.to_json()).unwrap(), op);
    }

    #[test]
    fn test_from_json_normalizes() {
        let op = TextOperation::from_json(r#"[2, 3, -1, "a", "b"]"#).unwrap();
        assert_eq!(op, TextOperation::new().retain(5).insert("ab").delete(1));
    }

    #[test]
    fn test_from_json_rejects_unknown_elements() {
        for json in [r#"[1, true]"#, r#"[0]"#, r#"[1.5]"#, r#"[null]"#, r#"[{"retain": 1}]"#] {
            assert!(
                matches!(TextOperation::from_json(json), Err(OtError::MalformedStep(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_json_rejects_length_overflow() {
        let max = i64::MAX;
        for json in [
            format!("[{max}, {max}, {max}]"),
            format!("[-{max}, -{max}, -{max}]"),
            format!("[{max}, {max}, {max}, \"x\"]"),
        ] {
            assert!(
                matches!(TextOperation::from_json(&json), Err(OtError::MalformedStep(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn test_try_push_leaves_operation_unchanged_on_overflow() {
        let mut op = TextOperation::new().retain(usize::MAX - 1);
        assert!(op.try_push(Op::Retain(2)).is_err());
        assert!(op.try_push(Op::Delete(2)).is_err());
        assert_eq!(op.ops(), &[Op::Retain(usize::MAX - 1)]);
        assert_eq!(op.base_len(), usize::MAX - 1);
        assert_eq!(op.target_len(), usize::MAX - 1);

        op.try_push(Op::Insert("a".into())).unwrap();
        assert_eq!(op.target_len(), usize::MAX);
        assert!(op.try_push(Op::Insert("b".into())).is_err());
        assert_eq!(op.ops().len(), 2);
    }

    #[test]
    fn test_serde_uses_wire_form() {
        let op = TextOperation::new().delete(1).insert("x");
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"["x",-1]"#);
        let back: TextOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert!(serde_json::from_str::<TextOperation>("[false]").is_err());
    }

    #[test]
    fn test_display() {
        let op = TextOperation::new().retain(5).insert(" world").delete(2);
        insta::assert_snapshot!(op.to_string(), @r#"retain 5, insert " world", delete 2"#);
        insta::assert_snapshot!(TextOperation::new().to_string(), @"noop");
    }
}
