const ESC: char = '\x1b';

/// Longest parameter list accepted when the ESC byte of a sequence was lost
/// somewhere in transit. Longer digit runs in brackets are kept as data.
const MAX_BARE_PARAMS: usize = 10;

/// Strips terminal escape sequences and control characters from captured output.
///
/// Removed shapes:
/// - `ESC [ params letter`, which covers SGR colors (`m`) and cursor/erase commands;
/// - `[ params letter` with 1 to 10 parameter characters, the same shape without its ESC;
/// - every other control character (C0, DEL, C1, lone ESC).
///
/// `\n`, `\r` and `\t` are preserved. An ESC-less form needs at least one
/// parameter, so `[H`, `[K` or `a[i]` stay: they cannot be told apart from
/// ordinary bracketed text such as `[Hello]`.
///
/// Runs in a single pass. A sequence is dropped as soon as its final letter
/// arrives, so removing one can expose the next enclosing one
/// (`[[33m3m` becomes empty) and the result is a fixed point:
/// `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut kept: Vec<char> = Vec::with_capacity(text.len());

    for c in text.chars() {
        // ESC only survives while it may still open `ESC [`.
        if kept.last() == Some(&ESC) && c != '[' {
            kept.pop();
        }

        if c == ESC {
            kept.push(c);
        } else if !is_stripped_control(c) {
            kept.push(c);
            if c.is_ascii_alphabetic() {
                drop_sequence_at_end(&mut kept);
            }
        }
    }

    kept.into_iter().filter(|c| *c != ESC).collect()
}

/// Removes the sequence closed by the letter on top of `kept`, if any.
///
/// Parameters below a letter that stays are never scanned again, and removed
/// ones are gone, so the whole scan stays linear in the input.
fn drop_sequence_at_end(kept: &mut Vec<char>) {
    let letter_at = kept.len() - 1;
    let params = kept[..letter_at]
        .iter()
        .rev()
        .take_while(|c| is_param(**c))
        .count();
    let Some(open_at) = letter_at.checked_sub(params + 1) else {
        return;
    };
    if kept[open_at] != '[' {
        return;
    }

    if open_at > 0 && kept[open_at - 1] == ESC {
        kept.truncate(open_at - 1);
    } else if (1..=MAX_BARE_PARAMS).contains(&params) {
        kept.truncate(open_at);
    }
}

fn is_param(c: char) -> bool {
    c.is_ascii_digit() || c == ';'
}

// C0, DEL and C1. ESC is handled separately.
fn is_stripped_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\n' | '\r' | '\t')
}
