//! Character sets for `Character` terminals
//!
//! A set literal such as `(abcdef0123456789)` lists its members one character at
//! a time. Members are kept as sorted code point spans, merged on insert, so a
//! membership test is one binary search.

/// Sorted, disjoint and non-adjacent inclusive code point spans
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RangeSet {
    spans: Vec<(u32, u32)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every character of a set literal
    pub fn from_chars(members: &str) -> Self {
        members.chars().collect()
    }

    pub fn from_range(first: char, last: char) -> Self {
        let mut set = RangeSet::new();
        set.add_range(first, last);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn add_char(&mut self, ch: char) {
        self.add_range(ch, ch);
    }

    /// Insert `first..=last`; an inverted range adds nothing
    pub fn add_range(&mut self, first: char, last: char) {
        self.insert_span(first as u32, last as u32);
    }

    fn insert_span(&mut self, mut lo: u32, mut hi: u32) {
        if lo > hi {
            return;
        }
        // [start, stop) are the spans that overlap or touch lo..=hi
        let start = self.spans.partition_point(|&(_, end)| end + 1 < lo);
        let stop = self.spans.partition_point(|&(begin, _)| begin <= hi + 1);
        if start < stop {
            lo = lo.min(self.spans[start].0);
            hi = hi.max(self.spans[stop - 1].1);
        }
        self.spans.splice(start..stop, [(lo, hi)]);
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut result = self.clone();
        for &(lo, hi) in &other.spans {
            result.insert_span(lo, hi);
        }
        result
    }

    /// Members of `self` that are not in `other`
    pub fn minus(&self, other: &RangeSet) -> RangeSet {
        let spans = self
            .spans
            .iter()
            .flat_map(|&(lo, hi)| {
                let mut pieces = Vec::new();
                let mut next = lo;
                for &(cut_lo, cut_hi) in other.spans.iter().filter(|&&(a, b)| b >= lo && a <= hi) {
                    if cut_lo > next {
                        pieces.push((next, cut_lo - 1));
                    }
                    next = next.max(cut_hi + 1);
                }
                if next <= hi {
                    pieces.push((next, hi));
                }
                pieces
            })
            .collect();
        RangeSet { spans }
    }

    pub fn contains(&self, ch: char) -> bool {
        let code = ch as u32;
        let index = self.spans.partition_point(|&(_, hi)| hi < code);
        self.spans.get(index).is_some_and(|&(lo, _)| lo <= code)
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Every member in ascending order, written back as a set literal
    pub fn to_literal(&self) -> String {
        self.spans
            .iter()
            .flat_map(|&(lo, hi)| lo..=hi)
            .filter_map(char::from_u32)
            .collect()
    }
}

impl FromIterator<char> for RangeSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        for ch in iter {
            set.add_char(ch);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chars_merges() {
        let set = RangeSet::from_chars("cabxz");
        assert_eq!(set.span_count(), 3);
        assert!(set.contains('a'));
        assert!(set.contains('c'));
        assert!(set.contains('z'));
        assert!(!set.contains('d'));
        assert!(!set.contains('y'));
        assert!(!set.contains(' '));
    }

    #[test]
    fn test_bridging_insert() {
        let mut set = RangeSet::from_chars("ae");
        set.add_range('b', 'd');
        assert_eq!(set.span_count(), 1);
        assert_eq!(set.to_literal(), "abcde");
    }

    #[test]
    fn test_empty() {
        let set = RangeSet::from_chars("");
        assert!(set.is_empty());
        assert!(!set.contains('a'));
        assert!(RangeSet::from_range('z', 'a').is_empty());
    }

    #[test]
    fn test_minus_splits_range() {
        let printable = RangeSet::from_range(' ', '~');
        let without_quote = printable.minus(&RangeSet::from_chars("'"));
        assert_eq!(without_quote.span_count(), 2);
        assert!(!without_quote.contains('\''));
        assert!(without_quote.contains(' '));
        assert!(without_quote.contains('~'));

        let edges = RangeSet::from_range('a', 'e').minus(&RangeSet::from_chars("ae"));
        assert_eq!(edges.to_literal(), "bcd");
    }

    #[test]
    fn test_union_and_literal() {
        let mut digits = RangeSet::from_range('0', '3');
        digits.add_char('9');
        let set = digits.union(&RangeSet::from_chars("4"));
        assert_eq!(set.to_literal(), "012349");
    }
}
