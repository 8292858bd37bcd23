use config::{Config, ConfigError, Environment, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::table::Encoding;

pub const CONFIG_FILENAME: &str = "split_and_grade.toml";

/// Template written on first run, when no configuration file exists yet.
pub const DEFAULT_CONFIG: &str = r#"# Configuration of split-and-grade. While this file does not exist, an
# INI file with the same name and the .ini extension (split_and_grade.ini,
# with sections [Output], [MainPDF], [MoodleGradesheet] and [GroupSheet])
# is read instead, so earlier configurations keep working.

# Directory in which the separated PDF files will be created. Inside
# 'attachments_dir' one directory per student is created.

[output]
attachments_dir = "attachments"

# PDF file containing the corrected assignments of every group, one group
# after another in the same order as the group sheet. This file is split.

[main_pdf]
file_name = "main.pdf"

# Moodle gradesheet (CSV) that receives the grade of each student. Its first
# row is a header, used to find where the student's information is read and
# where the grade is written.
#
# file_name         : name of the CSV gradesheet.
# encoding          : "utf-8" or "utf-8-sig" (tolerates and writes a leading BOM).
# id_column         : header of the column with the student's Moodle identifier.
#                     Needed to name the attachment directory of each student.
# mail_column       : header of the column with the student's e-mail address.
#                     Used to match each row with the group sheet.
# grade_column      : header of the column that receives the grades.
# full_name_column  : header of the column with the student's full name.
#                     Used to name the attachment directory.
# identifier_prefix : Moodle identifiers look like 'Participante3238724'. Only
#                     the number is wanted, so this prefix is stripped.

[roster]
file_name = "HojaMoodle.csv"
encoding = "utf-8"
id_column = "Identificador"
mail_column = "Dirección de correo"
grade_column = "Calificación"
full_name_column = "Nombre completo"
identifier_prefix = "Participante"

# Group sheet (CSV). The first row is a header naming each column.
#
# IMPORTANT: mail_column must be the last header of the sheet. Every cell from
#            that column onwards holds the e-mail address of one group member.
#
# file_name        : name of the CSV group sheet.
# encoding         : "utf-8" or "utf-8-sig".
# group_id_column  : header of the column with each group's identifier.
# grade_column     : header of the column with the grade of the assignment.
# num_pages_column : header of the column with the number of pages of the
#                    group's submission inside the main PDF file.
# mail_column      : header of the column with the members' e-mail addresses.

[group_sheet]
file_name = "Groups.csv"
encoding = "utf-8-sig"
group_id_column = "Grupo"
grade_column = "Calificacion"
num_pages_column = "NumPaginas"
mail_column = "Correos"
"#;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub main_pdf: MainPdfConfig,
    pub roster: RosterConfig,
    pub group_sheet: GroupSheetConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub attachments_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MainPdfConfig {
    pub file_name: String,
}

/// Header names and file settings of the Moodle gradesheet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RosterConfig {
    pub file_name: String,
    #[serde(default = "Encoding::roster_default")]
    pub encoding: Encoding,
    pub id_column: String,
    pub mail_column: String,
    pub grade_column: String,
    pub full_name_column: String,
    pub identifier_prefix: String,
}

/// Header names and file settings of the group sheet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupSheetConfig {
    pub file_name: String,
    #[serde(default = "Encoding::group_sheet_default")]
    pub encoding: Encoding,
    pub group_id_column: String,
    pub grade_column: String,
    pub num_pages_column: String,
    pub mail_column: String,
}

/// Section names of the INI layout read by earlier versions of the tool.
/// Keys inside each section are the same as in the TOML layout.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(rename = "Output")]
    output: OutputConfig,
    #[serde(rename = "MainPDF")]
    main_pdf: MainPdfConfig,
    #[serde(rename = "MoodleGradesheet")]
    roster: RosterConfig,
    #[serde(rename = "GroupSheet")]
    group_sheet: GroupSheetConfig,
}

impl From<LegacyConfig> for AppConfig {
    fn from(legacy: LegacyConfig) -> Self {
        Self {
            output: legacy.output,
            main_pdf: legacy.main_pdf,
            roster: legacy.roster,
            group_sheet: legacy.group_sheet,
        }
    }
}

fn is_legacy(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("ini"))
}

/// The file to load for `path`: `path` itself, or the `.ini` file next to
/// it with the same name. `None` when neither exists.
pub fn find_configuration(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let legacy = path.with_extension("ini");
    legacy.is_file().then_some(legacy)
}

fn file_source(path: &Path) -> Result<Config, ConfigError> {
    if is_legacy(path) {
        let legacy = Config::builder()
            .add_source(ConfigFile::from(path).format(FileFormat::Ini).required(true))
            .build()?
            .try_deserialize::<LegacyConfig>()?;
        return Config::try_from(&AppConfig::from(legacy));
    }

    Config::builder()
        .add_source(
            ConfigFile::from(path)
                .format(FileFormat::Toml)
                .required(true),
        )
        .build()
}

/// Load the configuration from a TOML file (or a legacy `.ini` file), letting
/// `SPLIT_GRADE_*` environment variables override single keys
/// (e.g. `SPLIT_GRADE_OUTPUT__ATTACHMENTS_DIR`).
pub fn load_configuration(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(file_source(path)?)
        .add_source(
            Environment::with_prefix("SPLIT_GRADE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

pub fn write_default_configuration(path: &Path) -> io::Result<()> {
    fs::write(path, DEFAULT_CONFIG)
}
