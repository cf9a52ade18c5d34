use std::collections::HashSet;

/// Convert heading text into a stable anchor identifier.
pub fn generate_anchor(text: &str) -> String {
    let mut anchor = String::new();
    let mut last_was_dash = false;

    for ch in text.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_alphanumeric() {
            anchor.push(ch);
            last_was_dash = false;
        } else if (ch.is_whitespace() || ch == '-') && !anchor.is_empty() && !last_was_dash {
            anchor.push('-');
            last_was_dash = true;
        }
    }

    if anchor.ends_with('-') {
        anchor.pop();
    }

    anchor
}

/// Anchors already handed out within one document.
#[derive(Debug, Default)]
pub struct AnchorSet {
    used: HashSet<String>,
}

impl AnchorSet {
    /// Returns a unique anchor for `text`, suffixing `-1`, `-2`, ... on
    /// collisions. `None` when the text has nothing to slug.
    pub fn claim(&mut self, text: &str) -> Option<String> {
        let base = generate_anchor(text);
        if base.is_empty() {
            return None;
        }

        if self.used.insert(base.clone()) {
            return Some(base);
        }

        let mut counter = 1usize;
        loop {
            let candidate = format!("{base}-{counter}");
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
            counter += 1;
        }
    }

    /// Marks an explicit id as taken so generated ones avoid it.
    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }
}
