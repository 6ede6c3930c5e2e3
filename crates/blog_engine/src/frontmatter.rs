use serde::{Deserialize, Serialize};

/// YAML header prepended to every rendered post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<FrontMatterImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatterImage {
    pub url: String,
    pub alt: String,
}

impl FrontMatter {
    /// Serializes as a `---` delimited YAML document followed by a blank line.
    pub fn to_yaml_block(&self) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("---\n{yaml}---\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::{FrontMatter, FrontMatterImage};

    fn sample(image: Option<FrontMatterImage>) -> FrontMatter {
        FrontMatter {
            title: "파이썬 RSS".to_string(),
            pub_date: "2025-11-09T21:05:00+09:00".to_string(),
            tags: vec!["python".to_string(), "rss".to_string()],
            image,
        }
    }

    #[test]
    fn yaml_block_is_delimited_and_parses_back() {
        let front = sample(Some(FrontMatterImage {
            url: "https://example.com/a.png".to_string(),
            alt: "cover".to_string(),
        }));
        let block = front.to_yaml_block().unwrap();

        assert!(block.starts_with("---\n"));
        assert!(block.ends_with("---\n\n"));
        assert!(block.contains("파이썬 RSS"));

        let inner = block.trim_start_matches("---\n").trim_end_matches("---\n\n");
        let parsed: FrontMatter = serde_yaml::from_str(inner).unwrap();
        assert_eq!(parsed, front);
    }

    #[test]
    fn image_key_is_omitted_when_absent() {
        let block = sample(None).to_yaml_block().unwrap();
        assert!(!block.contains("image"));
        assert!(block.contains("pubDate"));
    }
}
