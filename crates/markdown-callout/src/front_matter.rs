/// A document split into its optional front matter block and the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatterSplit<'a> {
    /// Front matter including both delimiter lines, exactly as written.
    pub front_matter: Option<&'a str>,
    pub body: &'a str,
}

/// Separates a leading `---` front matter block (closed by `---` or `...`)
/// from the rest of the document. An unterminated block is treated as body.
pub fn split_front_matter(source: &str) -> FrontMatterSplit<'_> {
    let mut state = FrontMatterState::default();
    let mut offset = 0usize;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        offset += line.len();
        if !state.consume(index, line) {
            break;
        }
        if state.done {
            return FrontMatterSplit {
                front_matter: Some(&source[..offset]),
                body: &source[offset..],
            };
        }
    }

    FrontMatterSplit {
        front_matter: None,
        body: source,
    }
}

#[derive(Default)]
struct FrontMatterState {
    active: bool,
    done: bool,
}

impl FrontMatterState {
    fn consume(&mut self, index: usize, line: &str) -> bool {
        if self.done {
            return false;
        }

        let trimmed = line.trim();

        if index == 0 && trimmed == "---" {
            self.active = true;
            return true;
        }

        if self.active {
            if trimmed == "---" || trimmed == "..." {
                self.active = false;
                self.done = true;
            }
            return true;
        }

        false
    }
}
