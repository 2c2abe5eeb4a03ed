/// Token-level overlap between two phrases.
///
/// `right` is the longest run of tokens ending `a` that also starts `b`;
/// `left` is the longest run starting `a` that also ends `b`. Either is
/// empty when there is no such run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlap {
    pub left: String,
    pub right: String,
}

impl Overlap {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Finds the left and right token overlap of `a` with `b`.
///
/// `b` is shrunk one token at a time from the end not taking part in the
/// overlap until its remainder lines up with the matching end of `a`.
pub fn find_overlap(a: &str, b: &str) -> Overlap {
    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();

    Overlap {
        left: left_overlap(&a_tokens, &b_tokens),
        right: right_overlap(&a_tokens, &b_tokens),
    }
}

// suffix of a == prefix of b; drop tokens from the end of b
fn right_overlap(a: &[&str], b: &[&str]) -> String {
    let mut end = b.len().min(a.len());
    while end > 0 {
        if a[a.len() - end..] == b[..end] {
            return b[..end].join(" ");
        }
        end -= 1;
    }
    String::new()
}

// prefix of a == suffix of b; drop tokens from the start of b
fn left_overlap(a: &[&str], b: &[&str]) -> String {
    let mut start = b.len().saturating_sub(a.len());
    while start < b.len() {
        let len = b.len() - start;
        if a[..len] == b[start..] {
            return b[start..].join(" ");
        }
        start += 1;
    }
    String::new()
}
