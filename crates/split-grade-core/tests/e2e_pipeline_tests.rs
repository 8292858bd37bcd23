use lopdf::{dictionary, Document, Object};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use split_grade_core::config::{
    AppConfig, GroupSheetConfig, MainPdfConfig, OutputConfig, RosterConfig,
};
use split_grade_core::extract::{PageSource, PdfSource};
use split_grade_core::table::{read_table, Encoding};
use split_grade_core::{Error, RunWarning, SilentReporter, SplitEngine};

/// Write a PDF with `pages` empty pages. Page `i` (zero-based) gets a
/// MediaBox width of `100 + i` so extracted pages can be identified.
fn create_test_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|i| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), (100 + i as i64).into(), 842.into()],
            });
            page_id.into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// MediaBox widths of every page, in page order.
fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_i64()
                .unwrap()
        })
        .collect()
}

const GROUP_SHEET: &str = "\u{feff}Grupo,Calificacion,NumPaginas,Correos\r\n\
G1,8,2,a@x.com,b@x.com\r\n\
G2,9,3,c@x.com,e@x.com\r\n";

const ROSTER: &str = "Identificador,Nombre completo,Dirección de correo,Estado,Calificación,Última modificación\r\n\
Participante11,Ana Pérez,a@x.com,Enviado,,2024-05-01\r\n\
Participante12,Luis Gil,b@x.com,Enviado,,2024-05-01\r\n\
Participante13,Marta Ruiz,c@x.com,Enviado,,2024-05-02\r\n\
Participante14,Dario Paz,d@x.com,Sin entrega,-,\r\n";

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config: AppConfig,
}

fn create_fixture(pdf_pages: usize) -> Fixture {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::write(root.join("Groups.csv"), GROUP_SHEET).unwrap();
    fs::write(root.join("HojaMoodle.csv"), ROSTER).unwrap();
    create_test_pdf(&root.join("main.pdf"), pdf_pages);

    let path = |name: &str| root.join(name).to_string_lossy().into_owned();
    let config = AppConfig {
        output: OutputConfig {
            attachments_dir: path("attachments"),
        },
        main_pdf: MainPdfConfig {
            file_name: path("main.pdf"),
        },
        roster: RosterConfig {
            file_name: path("HojaMoodle.csv"),
            encoding: Encoding::Utf8,
            id_column: "Identificador".to_string(),
            mail_column: "Dirección de correo".to_string(),
            grade_column: "Calificación".to_string(),
            full_name_column: "Nombre completo".to_string(),
            identifier_prefix: "Participante".to_string(),
        },
        group_sheet: GroupSheetConfig {
            file_name: path("Groups.csv"),
            encoding: Encoding::Utf8Sig,
            group_id_column: "Grupo".to_string(),
            grade_column: "Calificacion".to_string(),
            num_pages_column: "NumPaginas".to_string(),
            mail_column: "Correos".to_string(),
        },
    };

    Fixture {
        _dir: dir,
        root,
        config,
    }
}

fn student_pdf(root: &Path, dir_name: &str, group: &str) -> PathBuf {
    root.join("attachments")
        .join(dir_name)
        .join(format!("{}.pdf", group))
}

#[test]
fn test_full_pipeline() {
    let fixture = create_fixture(5);
    let engine = SplitEngine::new(fixture.config.clone());
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.groups, 2);
    assert_eq!(report.students, 4);
    assert_eq!(report.documents_written, 3);
    assert_eq!(report.sheet_pages, 5);
    assert_eq!(report.document_pages, 5);

    let root = &fixture.root;
    let ana = student_pdf(root, "Ana Pérez_11_assignsubmission_file_", "G1");
    let luis = student_pdf(root, "Luis Gil_12_assignsubmission_file_", "G1");
    let marta = student_pdf(root, "Marta Ruiz_13_assignsubmission_file_", "G2");
    assert_eq!(page_widths(&ana), vec![100, 101]);
    assert_eq!(page_widths(&luis), vec![100, 101]);
    assert_eq!(page_widths(&marta), vec![102, 103, 104]);

    // roster graded in place, everything else untouched
    let rows = read_table(&root.join("HojaMoodle.csv")).unwrap().rows;
    let grades: Vec<&str> = rows.iter().map(|r| r[4].as_str()).collect();
    assert_eq!(grades, vec!["Calificación", "8", "8", "9", "-"]);
    assert_eq!(rows[1][5], "2024-05-01");
    assert_eq!(rows[4][5], "");

    assert_eq!(
        report.warnings(),
        vec![
            RunWarning::RosterMailNotInGroups {
                mail: "d@x.com".to_string(),
                group_file: fixture.config.group_sheet.file_name.clone(),
            },
            RunWarning::StudentNotInRoster {
                mail: "e@x.com".to_string(),
                roster_file: fixture.config.roster.file_name.clone(),
            },
        ]
    );
}

#[test]
fn test_page_total_mismatch_is_a_warning() {
    let fixture = create_fixture(7);
    let report = SplitEngine::new(fixture.config.clone())
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(report.documents_written, 3);
    let mismatch = report
        .warnings()
        .into_iter()
        .find(|w| matches!(w, RunWarning::PageCountMismatch { .. }))
        .unwrap();
    assert_eq!(
        mismatch.to_string(),
        format!(
            "the group sheet accounts for 5 pages but {} has 7",
            fixture.config.main_pdf.file_name
        )
    );
}

#[test]
fn test_short_document_is_fatal() {
    let fixture = create_fixture(3);
    let err = SplitEngine::new(fixture.config.clone())
        .run(&SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::PageRangeOutOfBounds { .. }));
}

#[test]
fn test_missing_group_sheet_is_fatal() {
    let fixture = create_fixture(5);
    fs::remove_file(fixture.root.join("Groups.csv")).unwrap();

    let err = SplitEngine::new(fixture.config.clone())
        .run(&SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
    assert!(err.to_string().contains("Groups.csv"));
    // nothing extracted, roster untouched
    assert!(!fixture.root.join("attachments").exists());
    assert_eq!(
        fs::read_to_string(fixture.root.join("HojaMoodle.csv")).unwrap(),
        ROSTER
    );
}

#[test]
fn test_missing_roster_header_is_fatal() {
    let fixture = create_fixture(5);
    let mut config = fixture.config.clone();
    config.roster.full_name_column = "Nombre".to_string();

    let err = SplitEngine::new(config.clone())
        .run(&SilentReporter)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "File {} does not contain a header called Nombre",
            config.roster.file_name
        )
    );
}

#[test]
fn test_missing_main_pdf_is_fatal() {
    let fixture = create_fixture(5);
    fs::remove_file(fixture.root.join("main.pdf")).unwrap();

    let err = SplitEngine::new(fixture.config.clone())
        .run(&SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn test_pdf_source_extracts_middle_range() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.pdf");
    create_test_pdf(&main, 6);

    let source = PdfSource::open(&main).unwrap();
    assert_eq!(source.page_count(), 6);

    let out = dir.path().join("part.pdf");
    source.write_range(2, 3, &out).unwrap();
    assert_eq!(page_widths(&out), vec![102, 103, 104]);

    // the source is reusable after an extraction
    let last = dir.path().join("last.pdf");
    source.write_range(5, 1, &last).unwrap();
    assert_eq!(page_widths(&last), vec![105]);

    let err = source
        .write_range(5, 2, &dir.path().join("bad.pdf"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::PageRangeOutOfBounds {
            start: 5,
            count: 2,
            page_count: 6
        }
    ));
}

struct CountingSource {
    pages: usize,
    writes: std::cell::Cell<usize>,
}

impl PageSource for CountingSource {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn write_range(
        &self,
        _start: usize,
        _count: usize,
        destination: &Path,
    ) -> split_grade_core::error::Result<()> {
        self.writes.set(self.writes.get() + 1);
        fs::write(destination, b"")?;
        Ok(())
    }
}

#[test]
fn test_zero_page_group_is_skipped_with_warning() {
    let fixture = create_fixture(5);
    fs::write(
        fixture.root.join("Groups.csv"),
        format!("{}G3,10,0,d@x.com\r\n", GROUP_SHEET),
    )
    .unwrap();

    let source = CountingSource {
        pages: 5,
        writes: std::cell::Cell::new(0),
    };
    let report = SplitEngine::new(fixture.config.clone())
        .run_with_source(&source, &SilentReporter)
        .unwrap();

    assert_eq!(source.writes.get(), 3);
    assert_eq!(report.documents_written, 3);
    assert!(report.unmatched_roster_mails.is_empty());
    assert_eq!(
        report.warnings(),
        vec![
            RunWarning::StudentNotInRoster {
                mail: "e@x.com".to_string(),
                roster_file: fixture.config.roster.file_name.clone(),
            },
            RunWarning::EmptyPageRange {
                mail: "d@x.com".to_string(),
                group_id: "G3".to_string(),
            },
        ]
    );
    assert!(!fixture
        .root
        .join("attachments")
        .join("Dario Paz_14_assignsubmission_file_")
        .exists());

    // the zero-page group is still graded
    let rows = read_table(&fixture.root.join("HojaMoodle.csv")).unwrap().rows;
    assert_eq!(rows[4][4], "10");
}

#[test]
fn test_roster_layout_survives_grading() {
    let fixture = create_fixture(5);
    let roster_path = fixture.root.join("HojaMoodle.csv");
    let with_blank_line = ROSTER.replacen("2024-05-01\r\n", "2024-05-01\r\n\r\n", 1);
    fs::write(&roster_path, format!("\u{feff}{}", with_blank_line)).unwrap();
    fs::write(
        fixture.root.join("Groups.csv"),
        GROUP_SHEET.replace("G2,", "\r\nG2,"),
    )
    .unwrap();

    let report = SplitEngine::new(fixture.config.clone())
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(report.groups, 2);
    assert_eq!(report.documents_written, 3);
    assert_eq!(report.unmatched_roster_mails, vec!["d@x.com".to_string()]);

    // only the grade cells change: BOM and blank line are still there
    let expected = format!("\u{feff}{}", with_blank_line)
        .replace("a@x.com,Enviado,,", "a@x.com,Enviado,8,")
        .replace("b@x.com,Enviado,,", "b@x.com,Enviado,8,")
        .replace("c@x.com,Enviado,,", "c@x.com,Enviado,9,");
    assert_eq!(fs::read_to_string(&roster_path).unwrap(), expected);
}
