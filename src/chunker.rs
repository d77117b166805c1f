//! Splitting long replies into platform-sized messages.
//!
//! Splits only at line boundaries and keeps fenced code blocks balanced: a
//! block that straddles a split is closed at the end of one segment and
//! re-opened, with the same opening line, at the start of the next.

/// Maximum message length for Discord.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Literal that opens and closes a fenced code block.
pub const FENCE_MARKER: &str = "```";

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// One outgoing segment before rendering.
#[derive(Debug)]
struct Chunk<'a> {
    /// Opening fence line repeated from the previous segment.
    reopened: Option<&'a str>,
    /// Source lines, in order.
    lines: Vec<&'a str>,
    /// Whether a closing fence is appended on render.
    closed: bool,
    /// Rendered length in characters, excluding the appended fence.
    len: usize,
}

impl<'a> Chunk<'a> {
    fn new(reopened: Option<&'a str>) -> Self {
        Self {
            reopened,
            lines: Vec::new(),
            closed: false,
            len: reopened.map_or(0, char_len),
        }
    }

    fn single(line: &'a str) -> Self {
        let mut chunk = Self::new(None);
        chunk.push(line);
        chunk
    }

    fn is_empty(&self) -> bool {
        self.reopened.is_none() && self.lines.is_empty()
    }

    /// Nothing but the fence that opens the current block.
    fn opener_only(&self) -> bool {
        match self.reopened {
            Some(_) => self.lines.is_empty(),
            None => self.lines.len() == 1 && self.lines[0].starts_with(FENCE_MARKER),
        }
    }

    /// No text worth sending: only blank and fence lines.
    fn is_blank(&self) -> bool {
        self.lines
            .iter()
            .all(|line| line.trim().is_empty() || line.starts_with(FENCE_MARKER))
    }

    fn len_with(&self, line: &str) -> usize {
        if self.is_empty() {
            char_len(line)
        } else {
            self.len + 1 + char_len(line)
        }
    }

    fn push(&mut self, line: &'a str) {
        self.len = self.len_with(line);
        self.lines.push(line);
    }

    fn pop(&mut self) -> Option<&'a str> {
        let line = self.lines.pop()?;
        self.len = if self.is_empty() {
            0
        } else {
            self.len - 1 - char_len(line)
        };
        Some(line)
    }

    fn render(&self) -> String {
        self.reopened
            .into_iter()
            .chain(self.lines.iter().copied())
            .chain(self.closed.then_some(FENCE_MARKER))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Close `done` and return the chunk that continues after it.
fn flush<'a>(
    chunks: &mut Vec<Chunk<'a>>,
    mut done: Chunk<'a>,
    open_fence: Option<&'a str>,
) -> Chunk<'a> {
    let opened_last = open_fence.is_some()
        && done
            .lines
            .last()
            .is_some_and(|line| line.starts_with(FENCE_MARKER));

    let next = if opened_last {
        // The block opened on the last line: carry the opener forward rather
        // than sending an empty block.
        let mut next = Chunk::new(None);
        if let Some(opener) = done.pop() {
            next.push(opener);
        }
        next
    } else {
        done.closed = open_fence.is_some();
        Chunk::new(open_fence)
    };

    if !done.is_blank() {
        chunks.push(done);
    }
    next
}

fn chunk_lines(message: &str, max_len: usize) -> Vec<Chunk<'_>> {
    // Room kept free for the appended "\n```" while inside a block.
    let close_overhead = 1 + char_len(FENCE_MARKER);

    let mut chunks = Vec::new();
    let mut current = Chunk::new(None);
    let mut open_fence: Option<&str> = None;

    for line in message.split('\n') {
        let is_fence = line.starts_with(FENCE_MARKER);
        // A segment that may end inside a block must leave room to close it.
        let open_after = open_fence.is_some() != is_fence;
        let budget = if open_after {
            max_len.saturating_sub(close_overhead)
        } else {
            max_len
        };

        if !current.is_empty() && !current.opener_only() && current.len_with(line) > budget {
            current = flush(&mut chunks, current, open_fence);
        }

        // Blank lines at a segment boundary carry nothing.
        if current.is_empty() && line.trim().is_empty() {
            continue;
        }

        // A code line that cannot share a segment with its opener goes out
        // on its own, unfenced.
        if open_fence.is_some()
            && !is_fence
            && current.opener_only()
            && current.len_with(line) > budget
        {
            let alone = Chunk::single(line);
            if !alone.is_blank() {
                chunks.push(alone);
            }
            continue;
        }

        current.push(line);

        if is_fence {
            open_fence = match open_fence {
                Some(_) => None,
                None => Some(line),
            };
        }
    }

    if !current.is_blank() {
        chunks.push(current);
    }

    chunks
}

/// Split `message` into ordered segments of at most `max_len` characters.
///
/// A message that already fits is returned unchanged as the only segment.
/// Lines are never broken, so a single line longer than the budget becomes an
/// oversized segment of its own. Blank lines that fall on a split are dropped
/// and no segment is blank or made of fences alone.
#[must_use]
pub fn split_for_delivery(message: &str, max_len: usize) -> Vec<String> {
    if char_len(message) <= max_len {
        return vec![message.to_string()];
    }

    chunk_lines(message, max_len)
        .iter()
        .map(Chunk::render)
        .collect()
}
