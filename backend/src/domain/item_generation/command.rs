//! Item-generation requests and the stactools command they map to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Error;

/// Request to build one STAC item with a stactools package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    /// Python package providing the stactools plugin.
    pub package_name: String,
    /// CLI group the plugin registers under `stac`.
    pub group_name: String,
    /// Positional arguments for `create-item`.
    pub create_item_args: Vec<String>,
    /// `--option value` pairs for `create-item`.
    #[serde(default)]
    pub create_item_options: BTreeMap<String, String>,
    /// Overrides the `collection` field of the produced item.
    #[serde(default)]
    pub collection_id: Option<String>,
}

impl ItemRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if self.package_name.trim().is_empty() {
            return Err(Error::invalid_request("package_name must not be empty"));
        }
        if self.group_name.trim().is_empty() {
            return Err(Error::invalid_request("group_name must not be empty"));
        }
        Ok(())
    }
}

/// A fully resolved `uvx` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCommand {
    program: String,
    args: Vec<String>,
    output_path: PathBuf,
}

impl ItemCommand {
    /// Build the command for `request`, writing the item to `output_path`.
    ///
    /// A relative `output_path` resolves against the working directory the
    /// runner chooses.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::{ItemCommand, ItemRequest};
    ///
    /// let request: ItemRequest = serde_json::from_str(
    ///     r#"{"package_name":"stactools-glad-glclu2020","group_name":"gladglclu2020",
    ///         "create_item_args":["https://example.test/50N_090W.tif"]}"#,
    /// )
    /// .expect("valid request");
    /// let command = ItemCommand::for_request(&request, "item.json");
    /// assert_eq!(
    ///     command.to_string(),
    ///     "uvx --with requests,stactools-glad-glclu2020 --from stactools stac gladglclu2020 \
    ///      create-item https://example.test/50N_090W.tif item.json",
    /// );
    /// ```
    pub fn for_request(request: &ItemRequest, output_path: impl Into<PathBuf>) -> Self {
        let output_path = output_path.into();
        let mut args = vec![
            "--with".to_owned(),
            format!("requests,{}", request.package_name),
            "--from".to_owned(),
            "stactools".to_owned(),
            "stac".to_owned(),
            request.group_name.clone(),
            "create-item".to_owned(),
        ];
        args.extend(request.create_item_args.iter().cloned());
        for (option, value) in &request.create_item_options {
            args.push(format!("--{option}"));
            args.push(value.clone());
        }
        args.push(output_path.to_string_lossy().into_owned());
        Self {
            program: "uvx".to_owned(),
            args,
            output_path,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl std::fmt::Display for ItemCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
