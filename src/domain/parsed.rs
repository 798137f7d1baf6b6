use std::fmt;

/// An RSS channel as fetched, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

impl fmt::Display for ParsedFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  {}", self.link)?;
        if !self.description.is_empty() {
            writeln!(f, "  {}", self.description)?;
        }
        for item in &self.items {
            writeln!(f)?;
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParsedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "* {}", self.title)?;
        if !self.pub_date.is_empty() {
            writeln!(f, "  Published: {}", self.pub_date)?;
        }
        writeln!(f, "  {}", self.link)?;
        if !self.description.is_empty() {
            writeln!(f, "  {}", self.description)?;
        }
        Ok(())
    }
}
