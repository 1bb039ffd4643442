use std::collections::BTreeMap;
use std::path::Path;

use patchwork::prelude::*;
use patchwork::xml::json::{document_from_json, document_to_json};
use patchwork::xml::{render, Prolog, XmlNode, XmlTree};
use proptest::prelude::*;

const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>"#;

fn backends() -> Vec<&'static dyn Backend> {
    BackendKind::ALL.iter().map(|kind| kind.backend()).collect()
}

fn tag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["a", "b", "c", "osc"])
}

fn attributes() -> impl Strategy<Value = BTreeMap<&'static str, String>> {
    prop::collection::btree_map(
        prop::sample::select(vec!["name", "category", "comment", "i"]),
        "[a-zA-Z0-9 &<>'\"\\\\\t\n\r]{0,8}",
        0..3,
    )
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9&<>'\"]{1,8}"
}

fn leaf_node() -> impl Strategy<Value = XmlNode> {
    (tag(), attributes(), prop::option::of(text())).prop_map(|(tag, attributes, text)| {
        let mut node = XmlNode::new(tag);
        for (key, value) in attributes {
            node = node.attr(key, value);
        }
        if let Some(text) = text {
            node = node.text(text);
        }
        node
    })
}

fn node() -> impl Strategy<Value = XmlNode> {
    leaf_node().prop_recursive(3, 32, 5, |inner| {
        (leaf_node(), prop::collection::vec(inner, 0..5)).prop_map(|(mut node, children)| {
            for child in children {
                node = node.child(child);
            }
            node
        })
    })
}

fn document_text() -> impl Strategy<Value = (XmlNode, String)> {
    prop::collection::vec(node(), 0..6).prop_map(|children| {
        let mut root = XmlNode::new("patch").attr("revision", "21");
        for child in children {
            root = root.child(child);
        }
        let tree = XmlTree {
            prolog: Prolog::Unspecified,
            root: root.clone(),
        };
        let xml = render(&tree, &SerializationPolicy::default()).unwrap();
        (root, xml)
    })
}

proptest! {
    #[test]
    fn prop_backends_agree_and_reproduce_input((_, xml) in document_text()) {
        let trips = cross_validate(&xml, &backends(), &SerializationPolicy::default()).unwrap();
        for trip in &trips {
            prop_assert_eq!(&trip.xml, &xml);
        }
    }

    #[test]
    fn prop_sibling_order_preserved((root, xml) in document_text()) {
        let document = verify(&xml, BackendKind::Event.backend(), &SerializationPolicy::default()).unwrap();
        let element = document.root.as_object().unwrap();

        let expected: Vec<_> = root.elements().map(|node| node.tag.as_str()).collect();
        let actual: Vec<_> = element.child_tags().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_json_round_trip((_, xml) in document_text()) {
        let policy = SerializationPolicy::default();
        let document = verify(&xml, BackendKind::Tree.backend(), &policy).unwrap();

        let restored = document_from_json(&document_to_json(&document)).unwrap();
        prop_assert_eq!(&restored.root_tag, &document.root_tag);
        prop_assert_eq!(&restored.root, &document.root);
        prop_assert_eq!(restored.to_xml_string(&policy).unwrap(), xml);
    }
}

#[test]
fn test_multiplicity_round_trip() {
    let xml = format!(
        r#"{}<patch><osc type="0" /><lfo i="1">one</lfo><lfo i="2" /><lfo>three</lfo><fx /></patch>"#,
        DECL
    );
    let trips = cross_validate(&xml, &backends(), &SerializationPolicy::default()).unwrap();

    let root = trips[0].document.root.as_object().unwrap();
    let runs: Vec<_> = root.groups().iter().map(|g| (g.tag(), g.slot().len())).collect();
    assert_eq!(runs, [("osc", 1), ("lfo", 3), ("fx", 1)]);
    assert!(matches!(root.groups()[0].slot(), Slot::One(_)));
    assert!(matches!(root.groups()[1].slot(), Slot::Many(_)));

    let lfos: Vec<_> = root.children("lfo").collect();
    assert_eq!(lfos[2], &Value::Leaf("three".to_string()));
    assert_eq!(lfos[0].as_object().unwrap().text(), Some("one"));
}

fn preset_bytes(name: &str, xml: &str) -> Vec<u8> {
    let header = FixedHeader::new(*b"cjs3", name).unwrap();
    let mut preset = PresetFile::new(header, PatchHeader::new(*b"sub3"), xml.to_string()).unwrap();
    preset.payload = vec![0x10, 0x20, 0x30];
    preset.to_bytes().unwrap()
}

fn write(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

#[test]
fn test_preset_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Kalimba.fxp");
    let xml = format!(
        r#"{}<patch revision="21"><meta name="Kalimba Attempt" category="Rare Earth\Percussion" comment="Based on the &quot;Drum One&quot; preset." author="Leonard Bowman" /></patch>"#,
        DECL
    );
    let data = preset_bytes("Kalimba Attempt", &xml);
    write(&source, &data);

    let preset = PresetFile::load(&source).unwrap();
    assert_eq!(preset.program_name().unwrap(), "Kalimba Attempt");

    let target = dir.path().join("copy.fxp");
    preset.save(&target).unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), data);

    let document = verify(&preset.xml, BackendKind::Tree.backend(), &SerializationPolicy::default()).unwrap();
    assert_eq!(document.root_tag, "patch");
}

#[test]
fn test_batch_reports_failures_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("presets");
    let good = format!(r#"{}<patch revision="21"><meta name="Init" /></patch>"#, DECL);
    // no space before "/>", so the regenerated text differs
    let mismatched = format!(r#"{}<patch revision="21"><meta name="Init"/></patch>"#, DECL);

    write(&root.join("a_good.fxp"), &preset_bytes("Good", &good));
    write(&root.join("nested/b_good.FXP"), &preset_bytes("Nested", &good));
    let mut corrupt = preset_bytes("Corrupt", &good);
    corrupt[0] = b'X';
    write(&root.join("c_corrupt.fxp"), &corrupt);
    write(&root.join("d_mismatch.fxp"), &preset_bytes("Mismatch", &mismatched));
    write(&root.join("notes.txt"), b"not a preset");

    let found = find_presets(&root, "fxp").unwrap();
    assert_eq!(found.len(), 4);

    let dump_dir = dir.path().join("dump");
    let mut config = BatchConfig::new(&root);
    config.dump_dir = Some(dump_dir.clone());
    config.threads = Some(2);

    let mut last = (0, 0);
    let report = run_batch(&config, |done, total| last = (done, total)).unwrap();

    assert_eq!(last, (4, 4));
    assert_eq!(report.total, 4);
    assert_eq!(report.passed, 2);
    assert!(!report.is_success());

    let stages: Vec<_> = report.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, [Stage::Load, Stage::Convert]);
    assert!(report.failures[0].message.contains("chunk_magic"));
    assert!(report.failures[1].path.ends_with("d_mismatch.fxp"));
    assert!(report.failures[1].offset.is_some());

    assert!(dump_dir.join("a_good.before.xml").exists());
    assert!(dump_dir.join("a_good.after.xml").exists());
    assert!(dump_dir.join("a_good.json").exists());
    assert!(dump_dir.join("d_mismatch.after.xml").exists());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["passed"], 2);
    assert_eq!(json["failures"][1]["stage"], "convert");
}

#[test]
fn test_batch_without_backends_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("presets");
    let good = format!(r#"{}<patch revision="21"><meta name="Init" /></patch>"#, DECL);
    write(&root.join("a_good.fxp"), &preset_bytes("Good", &good));

    let mut config = BatchConfig::new(&root);
    config.backends.clear();
    assert!(matches!(run_batch(&config, |_, _| {}), Err(patchwork::Error::Config(_))));

    match process_file(&root.join("a_good.fxp"), &config) {
        FileOutcome::Failed(failure) => assert_eq!(failure.stage, Stage::Convert),
        FileOutcome::Passed(_) => panic!("passed without any backend"),
    }
}

#[test]
fn test_batch_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig::new(dir.path().join("absent"));
    assert!(run_batch(&config, |_, _| {}).is_err());
}
