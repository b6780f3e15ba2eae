//
// deid_workflows.rs
// Dicom-Deid-rs
//
// End-to-end runs over synthetic DICOM trees: per-subject folders, disc images, unknown subjects,
// corrupted inputs, sidecars and archival.
//
// Thales Matheus Mendonça Santos - November 2025

use std::cell::Cell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom_deid::anonymize::DicomEditor;
use dicom_deid::config::Config;
use dicom_deid::error::{DeidError, Result};
use dicom_deid::mount::ArchiveMounter;
use dicom_deid::run::{execute, RunOptions, RunReport, Target};
use tempfile::{tempdir, TempDir};

/// Hands out prepared directories instead of loop-mounting, counting both directions.
#[derive(Default)]
struct FakeMounter {
    images: HashMap<String, PathBuf>,
    mounts: Cell<usize>,
    unmounts: Cell<usize>,
}

impl ArchiveMounter for FakeMounter {
    fn mount(&self, image: &Path, _work_root: &Path) -> Result<PathBuf> {
        let name = image.file_name().unwrap().to_string_lossy().into_owned();
        let root = self
            .images
            .get(&name)
            .cloned()
            .ok_or_else(|| DeidError::mount(image, "not a disc image"))?;
        self.mounts.set(self.mounts.get() + 1);
        Ok(root)
    }

    fn unmount(&self, _mounted_root: &Path) -> Result<()> {
        self.unmounts.set(self.unmounts.get() + 1);
        Ok(())
    }
}

fn write_test_dicom(path: &Path, patient_id: &str, instance: u32) {
    // A tiny Secondary Capture instance carrying a few identifying attributes.
    let sop_instance = format!("1.2.826.0.1.3680043.2.1125.{instance}");
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    obj.put(DataElement::new(
        Tag(0x0010, 0x0010),
        VR::PN,
        PrimitiveValue::from("Test^Patient"),
    ));
    obj.put(DataElement::new(
        Tag(0x0010, 0x0020),
        VR::LO,
        PrimitiveValue::from(patient_id),
    ));
    obj.put(DataElement::new(
        Tag(0x0010, 0x0030),
        VR::DA,
        PrimitiveValue::from("19800101"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0080),
        VR::LO,
        PrimitiveValue::from("General Hospital"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0060),
        VR::CS,
        PrimitiveValue::from("OT"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0016),
        VR::UI,
        PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.7"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0018),
        VR::UI,
        PrimitiveValue::from(sop_instance.as_str()),
    ));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid(sop_instance.as_str())
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    file_obj.write_to_file(path).expect("write test dicom");
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(id_rows: &str) -> Self {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("ids.csv"), id_rows).expect("ids");
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn config(&self) -> Config {
        let yaml = format!(
            r#"
modifications:
  PatientName: "ANONYMOUS^PATIENT"
  PatientBirthDate: null
  InstitutionName: {{action: hash}}
new_IDs: {ids}
zip: {zip}
"#,
            ids = self.path("ids.csv").display(),
            zip = self.path("archive").display(),
        );
        Config::from_yaml_str(&yaml).expect("config")
    }

    fn run(&self, mounter: &FakeMounter, options: &RunOptions) -> RunReport {
        let target = Target::Paths {
            input: self.path("in"),
            output: self.path("out"),
        };
        execute(&self.config(), &target, options, &DicomEditor::new(), mounter).expect("run")
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("list")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn zip_entries(path: &Path) -> usize {
    zip::ZipArchive::new(File::open(path).expect("open zip"))
        .expect("read zip")
        .len()
}

fn patient_id_of(path: &Path) -> String {
    dicom::object::open_file(path)
        .expect("open cleaned")
        .element(Tag(0x0010, 0x0020))
        .expect("patient id")
        .to_str()
        .unwrap()
        .trim()
        .to_string()
}

#[test]
fn three_files_of_one_subject_share_one_folder_and_archive() {
    let ws = Workspace::new("A1,S1\nA2,S1\nA3,S1\n");
    write_test_dicom(&ws.path("in/IM1.dcm"), "A1", 1);
    write_test_dicom(&ws.path("in/series/IM2.dcm"), "A2", 2);
    write_test_dicom(&ws.path("in/series/deep/IM3.dcm"), "A3", 3);

    let report = ws.run(&FakeMounter::default(), &RunOptions::default());

    assert_eq!(report.summary.saved, 3);
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(
        files_in(&ws.path("out/S1")),
        vec!["IM1.dcm", "IM2.dcm", "IM3.dcm"]
    );
    assert_eq!(files_in(&ws.path("archive")), vec!["S1.zip"]);
    assert_eq!(zip_entries(&ws.path("archive/S1.zip")), 3);

    let cleaned = dicom::object::open_file(ws.path("out/S1/IM1.dcm")).expect("open");
    assert_eq!(patient_id_of(&ws.path("out/S1/IM1.dcm")), "S1");
    let name = cleaned
        .element(Tag(0x0010, 0x0010))
        .expect("name")
        .to_str()
        .unwrap()
        .trim()
        .to_string();
    assert_eq!(name, "ANONYMOUS^PATIENT");
    assert!(cleaned.element(Tag(0x0010, 0x0030)).is_err());
    let institution = cleaned
        .element(Tag(0x0008, 0x0080))
        .expect("institution")
        .to_str()
        .unwrap()
        .into_owned();
    assert_ne!(institution, "General Hospital");
}

#[test]
fn disc_image_contents_are_split_per_subject() {
    let ws = Workspace::new("P1,S1\nP2,S2\n");
    fs::create_dir_all(ws.path("in")).expect("mkdir");
    fs::write(ws.path("in/study.iso"), b"ISO 9660 placeholder").expect("iso");
    write_test_dicom(&ws.path("disc/DICOM/IM1"), "P1", 1);
    write_test_dicom(&ws.path("disc/DICOM/IM2"), "P2", 2);

    let mut mounter = FakeMounter::default();
    mounter
        .images
        .insert("study.iso".to_string(), ws.path("disc"));
    let report = ws.run(&mounter, &RunOptions::default());

    assert_eq!(mounter.mounts.get(), 1);
    assert_eq!(mounter.unmounts.get(), 1);
    assert_eq!(report.summary.mounted, 1);
    assert_eq!(files_in(&ws.path("out/S1")), vec!["IM1"]);
    assert_eq!(files_in(&ws.path("out/S2")), vec!["IM2"]);
    assert_eq!(files_in(&ws.path("archive")), vec!["S1.zip", "S2.zip"]);
}

#[test]
fn unmapped_subject_is_recorded_and_skipped() {
    let ws = Workspace::new("P1,S1\nP2,S2\n");
    write_test_dicom(&ws.path("in/a.dcm"), "P1", 1);
    write_test_dicom(&ws.path("in/b.dcm"), "P2", 2);
    write_test_dicom(&ws.path("in/c.dcm"), "S3", 3);

    let report = ws.run(&FakeMounter::default(), &RunOptions::default());

    assert_eq!(report.summary.saved, 2);
    assert_eq!(report.summary.unknown, 1);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.unknown.len(), 1);
    assert_eq!(report.unknown[0].source_id, "S3");
    assert!(report.unknown[0].path.ends_with("c.dcm"));
    assert!(!ws.path("out/S3").exists());
    assert_eq!(files_in(&ws.path("archive")), vec!["S1.zip", "S2.zip"]);

    let log = fs::read_to_string(ws.path("out/log.txt")).expect("log");
    assert!(log.contains("c.dcm skipped: subject id has no entry in the identifier table"));
}

#[test]
fn corrupted_file_fails_alone() {
    let ws = Workspace::new("P1,S1\n");
    for n in 1..=4 {
        write_test_dicom(&ws.path(&format!("in/IM{n}.dcm")), "P1", n);
    }
    fs::write(ws.path("in/IM5.dcm"), b"DICM? no, just some bytes").expect("corrupt");

    let report = ws.run(&FakeMounter::default(), &RunOptions::default());

    assert_eq!(report.summary.visited, 5);
    assert_eq!(report.summary.saved, 4);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(files_in(&ws.path("out/S1")).len(), 4);
    assert_eq!(zip_entries(&ws.path("archive/S1.zip")), 4);

    let log = fs::read_to_string(ws.path("out/log.txt")).expect("log");
    assert!(log.contains("IM5.dcm failed"));
    // no half-written leftovers anywhere in the output tree
    let partials = walkdir::WalkDir::new(ws.path("out"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
        .count();
    assert_eq!(partials, 0);
}

#[test]
fn override_and_sidecar_flags() {
    let ws = Workspace::new("P1,S1\n");
    write_test_dicom(&ws.path("in/a.dcm"), "NOT-IN-TABLE", 1);
    write_test_dicom(&ws.path("in/b.dcm"), "P1", 2);

    let options = RunOptions {
        emit_sidecar: true,
        subject_override: Some("STUDY-007".to_string()),
    };
    let report = ws.run(&FakeMounter::default(), &options);

    assert_eq!(report.summary.saved, 2);
    assert_eq!(
        files_in(&ws.path("out/STUDY-007")),
        vec!["a.dcm", "a.json", "b.dcm", "b.json"]
    );
    assert_eq!(patient_id_of(&ws.path("out/STUDY-007/a.dcm")), "STUDY-007");

    let sidecar: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(ws.path("out/STUDY-007/b.json")).expect("sidecar"),
    )
    .expect("json");
    assert_eq!(sidecar["00100020"]["Value"][0], "STUDY-007");
    assert!(sidecar.get("00100030").is_none());
}

#[test]
fn single_file_input_is_cleaned() {
    let ws = Workspace::new("P1,S1\n");
    write_test_dicom(&ws.path("in/one.dcm"), "P1", 1);

    let target = Target::Paths {
        input: ws.path("in/one.dcm"),
        output: ws.path("out"),
    };
    let report = execute(
        &ws.config(),
        &target,
        &RunOptions::default(),
        &DicomEditor::new(),
        &FakeMounter::default(),
    )
    .expect("run");

    assert_eq!(report.summary.saved, 1);
    assert_eq!(patient_id_of(&ws.path("out/S1/one.dcm")), "S1");
}
