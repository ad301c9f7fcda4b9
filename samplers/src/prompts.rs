//! Uniform sampling with replacement from a prompt list

use std::fs;
use std::path::Path;

use chatload_core::{ConfigError, ConfigResult, PromptSource};
use rand::seq::SliceRandom;

/// General-purpose prompts used when no prompt file is given
pub const BUILTIN_PROMPTS: &[&str] = &[
    "What is the capital of France?",
    "Explain the difference between a process and a thread.",
    "Write a haiku about autumn leaves.",
    "Summarize the plot of Romeo and Juliet in two sentences.",
    "What are three tips for writing readable code?",
    "How does a hash map handle collisions?",
    "Translate 'good morning' into Spanish, German and Japanese.",
    "Why is the sky blue?",
    "Suggest a name for a coffee shop that also sells books.",
    "What is the time complexity of binary search, and why?",
    "Give me a simple recipe for pancakes.",
    "Explain what an API rate limit is to a non-technical person.",
];

/// Samples prompts uniformly, with replacement
///
/// Never empty: every constructor rejects an empty list.
#[derive(Debug, Clone)]
pub struct PromptSampler {
    name: String,
    prompts: Vec<String>,
}

impl PromptSampler {
    /// Load prompts from a file, one per non-blank line
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::PromptSource(format!("failed to read {}: {}", path.display(), e))
        })?;

        let prompts: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if prompts.is_empty() {
            return Err(ConfigError::PromptSource(format!(
                "no prompts found in {}",
                path.display()
            )));
        }

        tracing::debug!(file = %path.display(), prompts = prompts.len(), "Loaded prompts");

        Ok(Self {
            name: path.display().to_string(),
            prompts,
        })
    }

    /// Use an in-memory list
    pub fn from_prompts(prompts: Vec<String>) -> ConfigResult<Self> {
        if prompts.is_empty() {
            return Err(ConfigError::PromptSource("prompt list is empty".into()));
        }
        Ok(Self {
            name: "inline".to_string(),
            prompts,
        })
    }

    /// Use [`BUILTIN_PROMPTS`]
    pub fn builtin() -> Self {
        Self {
            name: "builtin".to_string(),
            prompts: BUILTIN_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Get the number of prompts
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Check if the sampler has no prompts
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

impl PromptSource for PromptSampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&self) -> String {
        let mut rng = rand::thread_rng();
        self.prompts.choose(&mut rng).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sampler_from_prompts() {
        let sampler = PromptSampler::from_prompts(vec!["Hello, world!".to_string()]).unwrap();
        assert_eq!(sampler.len(), 1);
        assert_eq!(sampler.sample(), "Hello, world!");
        assert_eq!(sampler.name(), "inline");
    }

    #[test]
    fn test_sampler_empty_list() {
        assert!(matches!(
            PromptSampler::from_prompts(Vec::new()),
            Err(ConfigError::PromptSource(_))
        ));
    }

    #[test]
    fn test_sampler_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Prompt 1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  Prompt 2  ").unwrap();
        writeln!(file, "Prompt 3").unwrap();

        let sampler = PromptSampler::from_file(file.path()).unwrap();
        assert_eq!(sampler.len(), 3);
        assert_eq!(sampler.prompts, vec!["Prompt 1", "Prompt 2", "Prompt 3"]);

        for _ in 0..20 {
            let sample = sampler.sample();
            assert!(["Prompt 1", "Prompt 2", "Prompt 3"].contains(&sample.as_str()));
        }
    }

    #[test]
    fn test_sampler_blank_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        assert!(matches!(
            PromptSampler::from_file(file.path()),
            Err(ConfigError::PromptSource(_))
        ));
    }

    #[test]
    fn test_sampler_missing_file() {
        let result = PromptSampler::from_file(Path::new("/nonexistent/prompts.txt"));
        assert!(matches!(result, Err(ConfigError::PromptSource(_))));
    }

    #[test]
    fn test_builtin_samples_with_replacement() {
        let sampler = PromptSampler::builtin();
        assert_eq!(sampler.len(), BUILTIN_PROMPTS.len());

        // More draws than prompts must still work
        for _ in 0..(BUILTIN_PROMPTS.len() * 3) {
            assert!(BUILTIN_PROMPTS.contains(&sampler.sample().as_str()));
        }
    }
}
