// src/catalog/delimited.rs

//! Delimited-record catalog parser
//!
//! Parses `builds.csv` style files: a header line naming the columns followed
//! by one `;`-separated record per package.
//!
//! ```text
//! package;src_packages;build_script
//! binutils-pass1;binutils;binutils-pass1.sh
//! gcc-pass1;gcc:mpfr:gmp:mpc;gcc-pass1.sh
//! ```

use super::{CatalogFlavor, CatalogFormat, PackageDescriptor};
use crate::error::{Error, Result};
use std::path::PathBuf;

const DELIMITER: char = ';';
const SOURCE_SEPARATOR: char = ':';

const FIELD_PACKAGE: &str = "package";
const FIELD_SOURCES: &str = "src_packages";
const FIELD_SCRIPT: &str = "build_script";

/// Delimited catalog format resolving scripts against a scripts directory
pub struct DelimitedFormat {
    scripts_dir: PathBuf,
}

impl DelimitedFormat {
    pub fn new(scripts_dir: PathBuf) -> Self {
        Self { scripts_dir }
    }
}

/// Column positions taken from the header line
struct Columns {
    package: usize,
    sources: usize,
    script: usize,
    width: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<&str> = header.split(DELIMITER).map(str::trim).collect();
        let position = |field: &str| {
            names.iter().position(|name| *name == field).ok_or_else(|| {
                Error::Config(format!("Catalog header is missing the '{}' column", field))
            })
        };

        Ok(Self {
            package: position(FIELD_PACKAGE)?,
            sources: position(FIELD_SOURCES)?,
            script: position(FIELD_SCRIPT)?,
            width: names.len(),
        })
    }
}

impl CatalogFormat for DelimitedFormat {
    fn flavor(&self) -> CatalogFlavor {
        CatalogFlavor::LocalSources
    }

    fn parse(&self, content: &str) -> Result<Vec<PackageDescriptor>> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(Error::Config("Catalog is empty (no header line)".to_string()));
        };
        let columns = Columns::from_header(header)?;

        let mut packages = Vec::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
            if fields.len() != columns.width {
                return Err(Error::Config(format!(
                    "Line {}: expected {} fields, found {}",
                    line_no + 1,
                    columns.width,
                    fields.len()
                )));
            }

            let name = fields[columns.package];
            if name.is_empty() {
                return Err(Error::Config(format!(
                    "Line {}: missing required field '{}'",
                    line_no + 1,
                    FIELD_PACKAGE
                )));
            }

            let sources = fields[columns.sources]
                .split(SOURCE_SEPARATOR)
                .map(str::trim)
                .filter(|source| !source.is_empty())
                .map(String::from)
                .collect();

            let script = match fields[columns.script] {
                "" => PackageDescriptor::default_script_name(name),
                script => script.to_string(),
            };

            packages.push(PackageDescriptor {
                name: name.to_string(),
                sources,
                build_script: self.scripts_dir.join(script),
                environment: None,
            });
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn format() -> DelimitedFormat {
        DelimitedFormat::new(PathBuf::from("/opt/todd/build_scripts"))
    }

    #[test]
    fn test_parse_records() {
        let content = "package;src_packages;build_script\n\
                       binutils-pass1;binutils;binutils-pass1.sh\n\
                       gcc-pass1;gcc:mpfr:gmp:mpc;gcc-pass1.sh\n";

        let packages = format().parse(content).unwrap();
        assert_eq!(packages.len(), 2);

        assert_eq!(packages[0].name, "binutils-pass1");
        assert_eq!(packages[0].sources, vec!["binutils"]);
        assert_eq!(
            packages[0].build_script,
            PathBuf::from("/opt/todd/build_scripts/binutils-pass1.sh")
        );

        assert_eq!(packages[1].sources, vec!["gcc", "mpfr", "gmp", "mpc"]);
        assert!(packages[1].environment.is_none());
    }

    #[test]
    fn test_columns_in_any_order() {
        let content = "build_script;package;src_packages;notes\n\
                       m4-build.sh;m4;m4;first\n";

        let packages = format().parse(content).unwrap();
        assert_eq!(packages[0].name, "m4");
        assert!(packages[0].build_script.ends_with("m4-build.sh"));
    }

    #[test]
    fn test_empty_script_uses_default_and_blank_lines_skipped() {
        let content = "package;src_packages;build_script\n\n\
                       linux-headers;linux;\n\n";

        let packages = format().parse(content).unwrap();
        assert_eq!(packages.len(), 1);
        assert!(packages[0].build_script.ends_with("linux-headers.sh"));
    }

    #[test]
    fn test_empty_sources() {
        let content = "package;src_packages;build_script\nsetup;;setup.sh\n";
        let packages = format().parse(content).unwrap();
        assert!(packages[0].sources.is_empty());
    }

    #[test]
    fn test_missing_header_column() {
        let content = "package;build_script\nm4;m4.sh\n";
        match format().parse(content) {
            Err(Error::Config(msg)) => assert!(msg.contains("src_packages")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_field_count() {
        let content = "package;src_packages;build_script\nm4;m4\n";
        assert!(matches!(format().parse(content), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_package_name() {
        let content = "package;src_packages;build_script\n;m4;m4.sh\n";
        assert!(matches!(format().parse(content), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_content() {
        assert!(matches!(format().parse(""), Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_fails_whole_catalog() {
        let content = "package;src_packages;build_script\n\
                       m4;m4;m4.sh\n\
                       ncurses;ncurses;ncurses.sh\n\
                       m4;m4;m4.sh\n";

        let packages = format().parse(content).unwrap();
        let result = Catalog::from_descriptors(format().flavor(), packages);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
