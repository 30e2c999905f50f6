//! End-to-end tests over on-disk CVE files.

use std::fs;
use std::path::PathBuf;
use uct_common::release::{Registry, RegistryBuilder};
use uct_tracker::record::{Priority, Status};
use uct_tracker::{ParseError, ParseOptions, load_all, load_cve, load_cve_with};

fn registry() -> Registry {
    RegistryBuilder::new().build().unwrap()
}

fn write_cve(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const VALID: &str = "\
Candidate: CVE-2024-0001
PublicDate: 2024-01-15
References:
 https://ubuntu.com/security/notices
Description:
 A carefully crafted request allows remote
 code execution.
Ubuntu-Description:
 An attacker could run arbitrary code.
Notes:
 joe> checked the focal backport
 ann| restart required
  after upgrade
Mitigation:
Bugs:
 https://bugs.launchpad.net/bugs/1
Priority: high
Discovered-by: Jane Researcher
Assigned-to: alice
CVSS:
 nvd: CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H [9.8 CRITICAL]
Tags: cisa-kev
Patches_openssl:
 upstream: https://git.openssl.org/commit/abc123
Tags_openssl: pie
Priority_openssl: critical
upstream_openssl: released (3.0.13)
focal_openssl: needed
jammy_openssl: active
esm-apps/focal_openssl: released (1.1.1f-1ubuntu2)
";

#[test_log::test]
fn parses_a_complete_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(&dir, "CVE-2024-0001", VALID);

    let record = load_cve(&path, &registry()).unwrap();

    assert_eq!(record.candidate(), "CVE-2024-0001");
    assert_eq!(record.priority(), Priority::High);
    assert_eq!(record.package_priority("openssl"), Priority::Critical);
    assert_eq!(
        record.field("Description"),
        Some("A carefully crafted request allows remote\ncode execution.")
    );

    let openssl = &record.pkgs["openssl"];
    assert_eq!(openssl["upstream"].status, Status::Released);
    assert_eq!(openssl["upstream"].details, "3.0.13");
    assert_eq!(openssl["focal"].status, Status::Needed);
    assert_eq!(openssl["jammy"].status, Status::Active);
    assert_eq!(openssl["esm-apps/focal"].status, Status::Released);

    assert_eq!(record.notes.len(), 2);
    assert_eq!(record.notes[0].author, "joe");
    assert_eq!(record.notes[0].text, "checked the focal backport");
    assert_eq!(record.notes[1].author, "ann");
    assert_eq!(record.notes[1].text, "restart required after upgrade");

    assert!(record.tags["*"].contains("cisa-kev"));
    assert!(record.tags["openssl"].contains("pie"));

    assert_eq!(record.patches["openssl"].len(), 1);
    assert_eq!(record.patches["openssl"][0].kind, "upstream");

    assert_eq!(record.cvss.len(), 1);
    assert_eq!(record.cvss[0].source, "nvd");
    assert_eq!(record.cvss[0].report.base_score, 9.8);
    assert_eq!(record.cvss[0].report.base_severity.as_str(), "CRITICAL");
    let inline = record.cvss[0].inline.as_ref().unwrap();
    assert_eq!(inline.score, 9.8);
    assert_eq!(inline.severity, "CRITICAL");
}

#[test_log::test]
fn parsing_twice_yields_equal_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(&dir, "CVE-2024-0001", VALID);
    let registry = registry();

    let first = load_cve(&path, &registry).unwrap();
    let second = load_cve(&path, &registry).unwrap();
    assert_eq!(first, second);
}

#[test_log::test]
fn missing_candidate_field_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0002",
        "PublicDate: 2024-01-15\nDescription:\n x\n",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    assert!(err.to_string().contains("missing field 'Candidate'"), "{err}");
}

#[test_log::test]
fn problems_are_aggregated_not_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0003",
        "\
Candidate: CVE-2024-0003
Banana: yes
Priority: urgent
warty_openssl: needed
focal_openssl: wont-fix
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("unknown field 'Banana'"), "{message}");
    assert!(message.contains("invalid priority 'urgent'"), "{message}");
    assert!(message.contains("unknown release 'warty'"), "{message}");
    assert!(message.contains("invalid state 'wont-fix'"), "{message}");
    assert!(message.contains("missing field 'References'"), "{message}");
}

#[test_log::test]
fn duplicate_release_entry_names_the_first_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0004",
        "\
Candidate: CVE-2024-0004
upstream_openssl: needed
focal_openssl: needed
focal_openssl: released (1.0)
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    assert!(
        err.to_string()
            .contains("duplicate entry for openssl (focal), first seen on line 3"),
        "{err}"
    );
}

#[test_log::test]
fn internal_release_without_upstream_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0005",
        "\
Candidate: CVE-2024-0005
PublicDate: 2024-01-15
References:
Description:
Ubuntu-Description:
Notes:
Bugs:
Priority: low
Discovered-by:
Assigned-to:
CVSS:
esm-apps/focal_foo: released (1.0)
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    assert!(err.to_string().contains("missing upstream"), "{err}");
}

#[test_log::test]
fn boilerplate_files_may_omit_the_candidate_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "boilerplate.standard",
        "\
Candidate:
PublicDate:
References:
Description:
Ubuntu-Description:
Notes:
Bugs:
Priority: untriaged
Discovered-by:
Assigned-to:
CVSS:
",
    );

    let record = load_cve(&path, &registry()).unwrap();
    assert_eq!(record.candidate(), "");
}

#[test_log::test]
fn strict_mode_requires_a_public_date() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0006",
        "\
Candidate: CVE-2024-0006
PublicDate:
References:
Description:
Ubuntu-Description:
Notes:
Bugs:
Priority: low
Discovered-by:
Assigned-to:
CVSS:
",
    );
    let registry = registry();

    assert!(load_cve(&path, &registry).is_ok());

    let err = load_cve_with(&path, &registry, ParseOptions { strict: true }).unwrap_err();
    assert!(err.to_string().contains("empty field 'PublicDate'"), "{err}");
}

#[test_log::test]
fn missing_priority_defaults_to_untriaged() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0007",
        "\
Candidate: CVE-2024-0007
PublicDate: 2024-01-15
References:
Description:
Ubuntu-Description:
Notes:
Bugs:
Discovered-by:
Assigned-to:
CVSS:
",
    );

    let record = load_cve(&path, &registry()).unwrap();
    assert_eq!(record.priority(), Priority::Untriaged);
}

#[test_log::test]
fn active_state_requires_an_assignee() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0008",
        "\
Candidate: CVE-2024-0008
Assigned-to:
upstream_openssl: needed
focal_openssl: active
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    assert!(err.to_string().contains("Assigned-to"), "{err}");
}

#[test_log::test]
fn empty_package_suffix_is_a_bad_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0010",
        "\
Candidate: CVE-2024-0010
Priority_: high
Tags_: pie
Patches_:
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad field 'Priority_'"), "{message}");
    assert!(message.contains("bad field 'Tags_'"), "{message}");
    assert!(message.contains("bad field 'Patches_'"), "{message}");
}

#[test_log::test]
fn tags_outside_the_vocabulary_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0011",
        "\
Candidate: CVE-2024-0011
Tags: bogus-tag
Tags_openssl: not-a-tag pie
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("invalid tag 'bogus-tag' in 'Tags'"), "{message}");
    assert!(
        message.contains("invalid tag 'not-a-tag' in 'Tags_openssl'"),
        "{message}"
    );
}

#[test_log::test]
fn per_package_priority_fields_are_distinct() {
    let dir = tempfile::tempdir().unwrap();

    // Different package suffixes are different fields.
    let mut content = String::from(VALID);
    content.push_str("Priority_nginx: low\n");
    let path = write_cve(&dir, "CVE-2024-0001", &content);
    let record = load_cve(&path, &registry()).unwrap();
    assert_eq!(record.package_priority("openssl"), Priority::Critical);
    assert_eq!(record.package_priority("nginx"), Priority::Low);

    // Repeating the same literal name is flagged.
    let path = write_cve(
        &dir,
        "CVE-2024-0012",
        "\
Candidate: CVE-2024-0012
Priority_openssl: high
Priority_nginx: low
Priority_openssl: critical
",
    );
    let err = load_cve(&path, &registry()).unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("duplicate field 'Priority_openssl', first seen on line 2"),
        "{message}"
    );
    assert!(!message.contains("Priority_nginx"), "{message}");
}

#[test_log::test]
fn missing_cvss_metric_is_folded_into_the_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(
        &dir,
        "CVE-2024-0009",
        "\
Candidate: CVE-2024-0009
CVSS:
 nvd: CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H
",
    );

    let err = load_cve(&path, &registry()).unwrap_err();
    assert!(err.to_string().contains("availabilityImpact"), "{err}");
}

#[test_log::test]
fn records_serialize_with_status_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cve(&dir, "CVE-2024-0001", VALID);

    let record = load_cve(&path, &registry()).unwrap();
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["pkgs"]["openssl"]["focal"]["status"], "needed");
    assert_eq!(json["cvss"][0]["report"]["baseSeverity"], "CRITICAL");
}

#[test_log::test]
fn io_errors_surface_as_such() {
    let err = load_cve(&PathBuf::from("no/such/CVE-2024-0000"), &registry()).unwrap_err();
    assert!(matches!(err, ParseError::Io(_)));
}

#[test_log::test]
fn load_all_parses_each_file_independently() {
    let dir = tempfile::tempdir().unwrap();
    write_cve(&dir, "CVE-2024-0001", VALID);
    write_cve(&dir, "CVE-2024-0002", "Candidate: CVE-2024-0002\n");
    write_cve(&dir, "not-a-cve.txt", "ignored\n");

    let results = load_all(dir.path(), &registry()).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
}
