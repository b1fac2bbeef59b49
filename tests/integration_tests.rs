//! Integration tests for the EdilGest CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SECURITY_PASSWORD: &str = "AdminPassword2025!";

/// Helper to get an edilgest command bound to a workspace
fn edilgest(ws: &Path) -> Command {
    let mut cmd = Command::cargo_bin("edilgest").unwrap();
    cmd.arg("--workspace")
        .arg(ws)
        .env_remove("EDILGEST_PASSWORD")
        .env_remove("EDILGEST_SECURITY_PASSWORD")
        .env_remove("EDILGEST_REMOTE_DB")
        .env_remove("EDILGEST_ADMIN_PASSWORD_SHA256")
        .env_remove("EDILGEST_LOG");
    cmd
}

/// Helper to create a workspace with the sample registers
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    edilgest(tmp.path()).arg("init").assert().success();
    tmp
}

/// Workspace with the given account logged in
fn logged_in(username: &str) -> TempDir {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .args(["login", username, "--password", "password"])
        .assert()
        .success();
    tmp
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    Command::cargo_bin("edilgest")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("asset registry"))
        .stdout(predicate::str::contains("building"))
        .stdout(predicate::str::contains("road"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("edilgest")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("edilgest"));
}

#[test]
fn test_unknown_command_fails() {
    Command::cargo_bin("edilgest")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

#[test]
fn test_command_outside_workspace_fails() {
    let tmp = TempDir::new().unwrap();
    edilgest(tmp.path())
        .args(["building", "list"])
        .assert()
        .failure();
}

// ============================================================================
// Workspace and Session Tests
// ============================================================================

#[test]
fn test_init_creates_workspace_and_sample_data() {
    let tmp = TempDir::new().unwrap();
    edilgest(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized EdilGest workspace"))
        .stdout(predicate::str::contains("Sample registers installed"));

    assert!(tmp.path().join(".edilgest/config.yaml").exists());
    let data = fs::read_to_string(tmp.path().join(".edilgest/edilgest_pro_data.json")).unwrap();
    assert!(data.contains("IMM_000101"));
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_whoami_when_logged_out() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_login_with_wrong_password_fails() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .args(["login", "admin", "--password", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid username or password"));
}

#[test]
fn test_login_whoami_logout() {
    let tmp = logged_in("editor");
    edilgest(tmp.path())
        .args(["whoami", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("editor"))
        .stdout(predicate::str::contains("interventions"));

    edilgest(tmp.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out editor"));

    edilgest(tmp.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_reads_require_login() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .args(["building", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user is logged in"));
}

#[test]
fn test_section_access_is_enforced() {
    let tmp = logged_in("user");
    edilgest(tmp.path())
        .args(["user", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("user-management"));

    edilgest(tmp.path())
        .args(["import", "roads", "missing.csv"])
        .assert()
        .failure();
}

// ============================================================================
// Asset Register Tests
// ============================================================================

#[test]
fn test_building_list_shows_sample_registers() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["building", "list", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IMM_000101"))
        .stdout(predicate::str::contains("IMM_000105"));

    edilgest(tmp.path())
        .args(["building", "list", "--count"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_building_new_gets_next_code() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args([
            "building",
            "new",
            "--name",
            "Istituto Tecnico Minerario",
            "--address",
            "Via Roma 3, Iglesias",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created building IMM_000106"));

    edilgest(tmp.path())
        .args(["building", "show", "IMM_000106", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Istituto Tecnico Minerario"));
}

#[test]
fn test_plesso_rename_keeps_history() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["plesso", "edit", "PLX_000101", "--name", "Corpo A rinnovato"])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["plesso", "show", "PLX_000101", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Corpo A rinnovato"))
        .stdout(predicate::str::contains("Sede Centrale - Corpo A"));
}

#[test]
fn test_rename_back_keeps_full_history() {
    let tmp = logged_in("admin");
    for name in ["Corpo A rinnovato", "Sede Centrale - Corpo A", "Corpo A nuovo"] {
        edilgest(tmp.path())
            .args(["plesso", "edit", "PLX_000101", "--name", name])
            .assert()
            .success();
    }

    edilgest(tmp.path())
        .args(["plesso", "show", "PLX_000101"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Formerly:    Sede Centrale - Corpo A → Corpo A rinnovato",
        ));
}

#[test]
fn test_building_previous_name_is_searchable() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args([
            "building",
            "edit",
            "IMM_000105",
            "--previous-name",
            "Ex Caserma Mameli",
            "--previous-name",
            "Palazzo del Governo",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated building IMM_000105"));

    edilgest(tmp.path())
        .args(["building", "show", "IMM_000105"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ex Caserma Mameli → Palazzo del Governo"));

    edilgest(tmp.path())
        .args(["search", "caserma", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IMM_000105"))
        .stdout(predicate::str::contains("previous name"));
}

#[test]
fn test_edit_without_changes_saves_nothing() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["building", "edit", "IMM_000101"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change."));

    edilgest(tmp.path())
        .args(["log", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LOGIN"))
        .stdout(predicate::str::contains("UPDATE").not());
}

#[test]
fn test_pertinenza_new_and_list() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["pertinenza", "new", "--plesso", "PLX_000102", "--name", "Cortile interno"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created pertinenza"));

    edilgest(tmp.path())
        .args(["pertinenza", "list", "PLX_000102", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cortile interno"));
}

#[test]
fn test_road_delete_needs_security_password() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["road", "delete", "STR_000015", "--yes", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong security password"));

    edilgest(tmp.path())
        .args(["road", "delete", "STR_000015", "--yes", "--password", SECURITY_PASSWORD])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted road"));

    edilgest(tmp.path())
        .args(["road", "list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_protected_delete_is_admin_only() {
    let tmp = logged_in("editor");
    edilgest(tmp.path())
        .args(["building", "delete", "IMM_000105", "--yes", "--password", SECURITY_PASSWORD])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only administrators"));
}

#[test]
fn test_deleting_target_leaves_orphan_until_purged() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["road", "delete", "STR_000002", "--yes", "--password", SECURITY_PASSWORD])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["int", "list", "--orphans", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B23445566A"));

    edilgest(tmp.path())
        .args(["int", "purge-orphans", "--yes", "--password", SECURITY_PASSWORD])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 orphan intervention(s)"));

    edilgest(tmp.path())
        .args(["int", "list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

// ============================================================================
// Intervention Tests
// ============================================================================

#[test]
fn test_intervention_new_on_road() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args([
            "int",
            "new",
            "--cig",
            "Z1234567AB",
            "--title",
            "Segnaletica orizzontale SP 15",
            "--target",
            "STR_000015",
            "--type",
            "maintenance",
            "--amount",
            "12500",
            "--start",
            "2025-03-01",
            "--end",
            "2025-04-30",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created intervention INT_000003"));

    edilgest(tmp.path())
        .args(["int", "list", "--target", "STR_000015", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Z1234567AB"));
}

#[test]
fn test_intervention_unknown_target_fails() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["int", "new", "--cig", "X1", "--title", "Nulla", "--target", "STR_999999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STR_999999"));
}

#[test]
fn test_intervention_extend_moves_end_date() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["int", "extend", "INT_000001", "--days", "30", "--reason", "Maltempo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now ends 2024-07-30"));
}

#[test]
fn test_intervention_suspend() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args([
            "int",
            "suspend",
            "INT_000002",
            "--from",
            "2024-02-01",
            "--to",
            "2024-02-20",
            "--reason",
            "Ritrovamenti",
        ])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["int", "show", "INT_000002", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ritrovamenti"));
}

#[test]
fn test_rup_change_is_recorded() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["int", "edit", "INT_000001", "--rup", "Ing. Anna Serra"])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["int", "show", "INT_000001", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ing. Anna Serra"))
        .stdout(predicate::str::contains("Ing. Mario Rossi"));
}

#[test]
fn test_intervention_delete_with_confirmation() {
    let tmp = logged_in("editor");
    edilgest(tmp.path())
        .args(["int", "delete", "INT_000002", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted intervention CIG C99887766X"));
}

// ============================================================================
// CSV Tests
// ============================================================================

#[test]
fn test_import_template() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .args(["import", "roads", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "codice_sp,nome,lunghezza_km,descrizione,codice_univoco",
        ));
}

#[test]
fn test_import_roads() {
    let tmp = logged_in("admin");
    let csv = tmp.path().join("strade.csv");
    fs::write(
        &csv,
        "codice_sp,nome,lunghezza_km,descrizione,codice_univoco\n\
         SP 80,Strada del Sulcis,11.2,Tratto costiero,\n",
    )
    .unwrap();

    edilgest(tmp.path())
        .args(["import", "roads"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Importate con successo 1 strade."));

    edilgest(tmp.path())
        .args(["road", "show", "SP 80", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STR_000016"));
}

#[test]
fn test_import_dry_run_saves_nothing() {
    let tmp = logged_in("admin");
    let csv = tmp.path().join("immobili.csv");
    fs::write(
        &csv,
        "nome,indirizzo,descrizione,codice_univoco,centro_costo\n\
         Magazzino,Via Po 2,,,\n",
    )
    .unwrap();

    edilgest(tmp.path())
        .args(["import", "structures", "--dry-run"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: 1 of 1"));

    edilgest(tmp.path())
        .args(["building", "list", "--count"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_import_interventions_rejects_unknown_targets() {
    let tmp = logged_in("admin");
    let csv = tmp.path().join("interventi.csv");
    fs::write(
        &csv,
        "cig,titolo,oggetto,importo,rup,data_inizio,data_fine,codice_univoco_asset_target,tipologia\n\
         A1,Tetto,Coperture,1000,Rossi,2024-01-01,2024-02-01,IMM_000101,Manutenzioni\n\
         A2,Muro,Recinzione,500,Rossi,2024-01-01,2024-02-01,IMM_999999,Manutenzioni\n",
    )
    .unwrap();

    edilgest(tmp.path())
        .args(["import", "interventions"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Importati 1 interventi. 1 record scartati"));
}

#[test]
fn test_export_importable_round_trip_header() {
    let tmp = logged_in("admin");
    let out = tmp.path().join("interventi.csv");
    edilgest(tmp.path())
        .args(["export", "interventions", "--importable", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 row(s)"));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("cig,titolo,oggetto,importo,rup"));
    assert!(text.contains("STR_000002"));
}

#[test]
fn test_export_generic_structures() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["export", "structures"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"uniqueCode\""))
        .stdout(predicate::str::contains("\"IMM_000105\""));
}

// ============================================================================
// Reports, Log and Settings Tests
// ============================================================================

#[test]
fn test_report_interventions_summary() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["report", "interventions", "--rup", "rossi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Report interventi"))
        .stdout(predicate::str::contains("B23445566A"))
        .stdout(predicate::str::contains("C99887766X").not());
}

#[test]
fn test_report_deadlines_window() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["report", "deadlines", "--today", "2024-06-25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fine lavori CIG B23445566A"));
}

#[test]
fn test_report_dashboard_json() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["report", "dashboard", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"structures\": 2"))
        .stdout(predicate::str::contains("\"roads\": 2"));
}

#[test]
fn test_report_sheet() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["report", "sheet", "INT_000002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scheda intervento INT_000002"))
        .stdout(predicate::str::contains("C99887766X"));
}

#[test]
fn test_log_records_login_and_changes() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["building", "edit", "IMM_000105", "--address", "Piazza Roma 2, Carbonia"])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["log", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LOGIN"))
        .stdout(predicate::str::contains("UPDATE"));

    edilgest(tmp.path())
        .args(["log", "--action", "login", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UPDATE").not());
}

#[test]
fn test_settings_notifications_update() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["settings", "notifications", "--days", "30", "--test", "false"])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["settings", "show", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"daysBeforeDeadline\": 30"))
        .stdout(predicate::str::contains("\"notifyTest\": false"));
}

#[test]
fn test_security_policy_blocks_foreign_domains() {
    let tmp = logged_in("admin");
    edilgest(tmp.path())
        .args(["settings", "security", "--enforce", "true", "--domains", "provincia.it"])
        .assert()
        .success();

    edilgest(tmp.path())
        .args(["user", "new", "--username", "ospite", "--email", "ospite@gmail.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the allowed list"));

    edilgest(tmp.path())
        .args(["user", "new", "--username", "tecnico", "--email", "tecnico@provincia.it"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user tecnico"));
}

#[test]
fn test_manual_edit_is_admin_only() {
    let tmp = logged_in("editor");
    edilgest(tmp.path())
        .args(["manual", "edit", "man-1", "--content", "Nuovo testo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only administrators"));
}

// ============================================================================
// Technical Registry Tests
// ============================================================================

#[test]
fn test_registry_lists_buildings_with_plessi() {
    let tmp = logged_in("user");
    edilgest(tmp.path())
        .args(["registry", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IMM_000101"))
        .stdout(predicate::str::contains("PLX_000102"))
        .stdout(predicate::str::contains("STR_000002").not());

    edilgest(tmp.path())
        .args(["registry", "--type", "plesso", "--count"])
        .assert()
        .success()
        .stdout("3\n");

    edilgest(tmp.path())
        .args(["registry", "--cost-center", "AMMIN_CENTRALE", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IMM_000105"))
        .stdout(predicate::str::contains("IMM_000101").not());
}

#[test]
fn test_registry_road_filters() {
    let tmp = logged_in("editor");
    edilgest(tmp.path())
        .args(["registry", "--status", "sufficiente", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STR_000015"))
        .stdout(predicate::str::contains("STR_000002").not());

    edilgest(tmp.path())
        .args(["registry", "--roads", "--cost-centers"])
        .assert()
        .success()
        .stdout("VIAB_AREA_CENTRALE\nVIAB_AREA_SUD\n");

    edilgest(tmp.path())
        .args(["registry", "--roads", "--type", "plesso"])
        .assert()
        .failure();
}

#[test]
fn test_registry_requires_login() {
    let tmp = setup_workspace();
    edilgest(tmp.path())
        .args(["registry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user is logged in"));
}

#[test]
fn test_search_across_registers() {
    let tmp = logged_in("user");
    edilgest(tmp.path())
        .args(["search", "marconi", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IMM_000101"))
        .stdout(predicate::str::contains("INT_000002"));
}

#[test]
fn test_completions_generate() {
    Command::cargo_bin("edilgest")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edilgest"));
}
