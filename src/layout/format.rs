use crate::{
    export::filename::kebab_case,
    foundation::error::{LookupKind, TopotrackError, TopotrackResult},
};

/// A target output size. The aspect ratio is shared by the on-screen preview and the export.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Format {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Format {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> TopotrackResult<Self> {
        let f = Self {
            name: name.into(),
            width,
            height,
        };
        f.validate()?;
        Ok(f)
    }

    pub fn validate(&self) -> TopotrackResult<()> {
        if self.name.trim().is_empty() {
            return Err(TopotrackError::validation("format name must be non-empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(TopotrackError::validation(format!(
                "format '{}' must have width/height > 0",
                self.name
            )));
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn kebab_name(&self) -> String {
        kebab_case(&self.name)
    }

    pub fn square() -> Self {
        Self::builtin("Square", 1080, 1080)
    }

    pub fn landscape() -> Self {
        Self::builtin("Landscape", 1920, 1080)
    }

    pub fn portrait() -> Self {
        Self::builtin("Portrait", 1080, 1920)
    }

    pub fn story() -> Self {
        Self::builtin("Story", 1080, 1350)
    }

    fn builtin(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }
}

/// Ordered set of formats, unique by kebab-cased name.
#[derive(Clone, Debug, Default)]
pub struct FormatCatalog {
    formats: Vec<Format>,
}

impl FormatCatalog {
    pub fn builtin() -> Self {
        Self {
            formats: vec![
                Format::square(),
                Format::landscape(),
                Format::portrait(),
                Format::story(),
            ],
        }
    }

    pub fn insert(&mut self, format: Format) -> TopotrackResult<()> {
        format.validate()?;
        let key = format.kebab_name();
        if self.formats.iter().any(|f| f.kebab_name() == key) {
            return Err(TopotrackError::validation(format!(
                "format '{}' is already defined",
                format.name
            )));
        }
        self.formats.push(format);
        Ok(())
    }

    /// Lookup by display name or kebab name, ignoring case.
    pub fn get(&self, name: &str) -> TopotrackResult<&Format> {
        let key = kebab_case(name);
        self.formats
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name) || f.kebab_name() == key)
            .ok_or_else(|| TopotrackError::not_found(LookupKind::Format, name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
