use crc32fast::Hasher;

/// Derive a stable id seed from a content identifier using CRC32
pub fn content_seed(content_id: &str) -> String {
    let mut buff = String::from(content_id);
    if !content_id.starts_with("lumo://") {
        buff = format!("lumo://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential node id generator for a single document.
///
/// The counter only moves forward: ids handed out once are never handed out
/// again for the lifetime of the generator, even if the node they named was
/// deleted and its deletion undone.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(content_id: &str) -> Self {
        Self {
            seed: content_seed(content_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Advance the counter past an id that already exists
    pub fn observe(&mut self, id: &str) {
        let Some(suffix) = id
            .strip_prefix(self.seed.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
        else {
            return;
        };

        if let Ok(n) = suffix.parse::<u64>() {
            self.count = self.count.max(n);
        }
    }

    /// Get document ID seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}
