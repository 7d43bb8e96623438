//! Order-dense sort keys over the alphabet `a..z`.
//!
//! Keys are compared lexicographically. `key_between` produces a key
//! strictly between two neighbors without renumbering either, so tasks can
//! be reordered one at a time forever; repeated subdivision just grows the
//! key by a character every ~`log26` insertions. Keys this module generates
//! never end in `a` (a trailing zero digit), which keeps a lower neighbor
//! reachable for every key. Foreign keys that do end in `a` are tolerated:
//! the worst case degrades to appending after the lower bound.

const RADIX: u16 = 26;

fn digits(s: &str) -> Vec<u16> {
    s.bytes()
        .map(|b| (b.saturating_sub(b'a') as u16).min(RADIX - 1))
        .collect()
}

fn render(digits: &[u16]) -> String {
    digits.iter().map(|d| (b'a' + *d as u8) as char).collect()
}

/// Digit-wise midpoint of `lo` and `hi` (`None` = open upper bound).
/// For upper bounds without trailing zero digits the result is strictly
/// inside the interval.
fn midpoint(lo: &str, hi: Option<&str>) -> String {
    let a = digits(lo);
    let b = hi.map(digits);

    let mut out: Vec<u16> = Vec::new();
    let mut i = 0usize;
    // Track b's digits only until we first go strictly below them; from
    // then on the upper bound is open.
    let mut bounded = b.is_some();
    loop {
        let da = a.get(i).copied().unwrap_or(0);
        let db = if bounded {
            b.as_ref()
                .and_then(|b| b.get(i))
                .copied()
                .unwrap_or(RADIX)
        } else {
            RADIX
        };
        if db > da + 1 {
            out.push(da + (db - da) / 2);
            return render(&out);
        }
        out.push(da);
        if db == da + 1 {
            bounded = false;
        }
        i += 1;
    }
}

/// Generate a key strictly between `lo` (exclusive, `None` = start) and
/// `hi` (exclusive, `None` = end). Tolerates arbitrary prior keys; when
/// the bounds leave no digit-level room (inverted, equal, or an upper
/// bound padded with trailing `a`s) the call stays safe and sorts the
/// result after `lo`.
pub fn key_between(lo: Option<&str>, hi: Option<&str>) -> String {
    let lo = lo.unwrap_or("");
    let Some(hi) = hi else {
        return midpoint(lo, None);
    };
    if lo >= hi {
        return format!("{lo}n");
    }
    let candidate = midpoint(lo, Some(hi));
    if candidate.as_str() < hi {
        return candidate;
    }
    // hi carries trailing zero digits; the longest prefix of hi that still
    // exceeds lo is the only key left between them.
    for i in (1..hi.len()).rev() {
        let p = &hi[..i];
        if p > lo {
            return p.to_string();
        }
    }
    format!("{lo}n")
}
