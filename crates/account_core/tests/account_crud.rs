use account_core::db::migrations::latest_version;
use account_core::db::{open_db, open_db_in_memory};
use account_core::{
    create_accounts_atomic, load_fixture, Account, AccountListQuery, AccountRepository,
    AccountValidationError, RepoError, SqliteAccountRepository,
};
use chrono::DateTime;
use rusqlite::Connection;

const FIXTURE_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/account_data.json"
);

fn fixture_accounts() -> Vec<Account> {
    load_fixture(FIXTURE_PATH).unwrap()
}

/// Opens a fresh session and truncates the table, like every test expects.
fn session() -> Connection {
    let conn = open_db_in_memory().unwrap();
    SqliteAccountRepository::try_new(&conn)
        .unwrap()
        .delete_all_accounts()
        .unwrap();
    conn
}

#[test]
fn create_an_account() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = fixture_accounts().remove(0);
    assert!(account.id.is_none());
    account.create(&repo).unwrap();

    assert!(account.id.is_some());
    assert!(account.date_joined.is_some());
    assert_eq!(Account::all(&repo).unwrap().len(), 1);
}

#[test]
fn create_all_accounts() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let fixtures = fixture_accounts();

    for mut account in fixtures.clone() {
        account.create(&repo).unwrap();
    }

    assert_eq!(Account::all(&repo).unwrap().len(), fixtures.len());
}

#[test]
fn create_ignores_stale_id_and_assigns_a_new_one() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut first = fixture_accounts().remove(0);
    let first_id = first.create(&repo).unwrap();

    let mut copy = first.clone();
    let copy_id = copy.create(&repo).unwrap();

    assert_ne!(first_id, copy_id);
    assert_eq!(Account::all(&repo).unwrap().len(), 2);
}

#[test]
fn create_rejects_invalid_fields() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = Account::new("", "nobody@example.com");
    let err = account.create(&repo).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(AccountValidationError::BlankName)
    ));
    assert!(account.id.is_none());
    assert!(Account::all(&repo).unwrap().is_empty());
}

#[test]
fn to_dict_matches_created_account() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    for mut account in fixture_accounts() {
        account.create(&repo).unwrap();
        let result = account.to_dict();

        assert_eq!(result["id"], account.id.unwrap());
        assert_eq!(result["name"], account.name.as_str());
        assert_eq!(result["email"], account.email.as_str());
        assert_eq!(result["phone_number"], account.phone_number.as_str());
        assert_eq!(result["disabled"], account.disabled);

        let joined = result["date_joined"]
            .as_str()
            .expect("date_joined should be a string");
        let parsed = DateTime::parse_from_rfc3339(joined).expect("date_joined should be ISO-8601");
        assert_eq!(parsed, account.date_joined.unwrap());
    }
}

#[test]
fn from_dict_sets_fields_but_not_date_joined() {
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(FIXTURE_PATH).unwrap()).unwrap();

    for data in raw.as_array().unwrap() {
        let data = data.as_object().unwrap();
        let mut account = Account::default();
        account.from_dict(data).unwrap();

        assert_eq!(account.name, data["name"].as_str().unwrap());
        assert_eq!(account.email, data["email"].as_str().unwrap());
        assert_eq!(account.phone_number, data["phone_number"].as_str().unwrap());
        assert_eq!(account.disabled, data["disabled"].as_bool().unwrap());
        assert!(account.date_joined.is_none());
    }
}

#[test]
fn update_account_persists_changed_field_only() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let original = fixture_accounts().remove(2);

    let mut account = original.clone();
    account.create(&repo).unwrap();
    let id = account.id.expect("created account should have an id");

    account.name = "Rumpelstiltskin".to_string();
    account.update(&repo).unwrap();

    let found = Account::find(&repo, id).unwrap().unwrap();
    assert_eq!(found.name, "Rumpelstiltskin");
    assert_eq!(found.email, original.email);
    assert_eq!(found.phone_number, original.phone_number);
    assert_eq!(found.disabled, original.disabled);
    assert_eq!(found.date_joined, account.date_joined);
}

#[test]
fn update_without_id_is_a_validation_error() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = fixture_accounts().remove(1);
    account.id = None;
    let err = account.update(&repo).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(AccountValidationError::MissingId)
    ));
}

#[test]
fn update_unknown_id_returns_not_found() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = fixture_accounts().remove(0);
    account.id = Some(4242);
    let err = account.update(&repo).unwrap_err();

    assert!(matches!(err, RepoError::NotFound(4242)));
}

#[test]
fn delete_account_removes_row() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = fixture_accounts().remove(3);
    account.create(&repo).unwrap();
    assert_eq!(Account::all(&repo).unwrap().len(), 1);

    account.delete(&repo).unwrap();
    assert!(account.id.is_none());
    assert!(account.date_joined.is_none());
    let dict = account.to_dict();
    assert_eq!(dict["id"], serde_json::Value::Null);
    assert_eq!(dict["date_joined"], serde_json::Value::Null);
    assert!(Account::all(&repo).unwrap().is_empty());
}

#[test]
fn delete_requires_a_created_account() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let mut account = fixture_accounts().remove(0);
    let err = account.delete(&repo).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(AccountValidationError::MissingId)
    ));

    account.id = Some(77);
    let err = account.delete(&repo).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(77)));
    assert_eq!(account.id, Some(77));
}

#[test]
fn find_missing_id_returns_none() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    assert!(Account::find(&repo, 1).unwrap().is_none());
}

#[test]
fn find_by_name_matches_exactly() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    for mut account in fixture_accounts() {
        account.create(&repo).unwrap();
    }

    let found = Account::find_by_name(&repo, "Yuki Tanaka").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "yuki.tanaka@example.net");

    assert!(Account::find_by_name(&repo, "yuki tanaka").unwrap().is_empty());
}

#[test]
fn list_filters_disabled_and_paginates_by_id() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let mut ids = Vec::new();
    for mut account in fixture_accounts() {
        ids.push(account.create(&repo).unwrap());
    }

    let disabled = repo
        .list_accounts(&AccountListQuery {
            disabled: Some(true),
            ..AccountListQuery::default()
        })
        .unwrap();
    assert_eq!(disabled.len(), 2);
    assert!(disabled.iter().all(|account| account.disabled));

    let page = repo
        .list_accounts(&AccountListQuery {
            limit: Some(2),
            offset: 1,
            ..AccountListQuery::default()
        })
        .unwrap();
    let page_ids: Vec<_> = page.iter().map(|account| account.id.unwrap()).collect();
    assert_eq!(page_ids, ids[1..3].to_vec());

    let tail = repo
        .list_accounts(&AccountListQuery {
            offset: 3,
            ..AccountListQuery::default()
        })
        .unwrap();
    assert_eq!(tail.len(), 2);
}

#[test]
fn delete_all_accounts_truncates_table() {
    let conn = session();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    for mut account in fixture_accounts() {
        account.create(&repo).unwrap();
    }

    assert_eq!(repo.delete_all_accounts().unwrap(), 5);
    assert!(Account::all(&repo).unwrap().is_empty());
}

#[test]
fn atomic_batch_commits_every_account() {
    let mut conn = session();
    let mut accounts = fixture_accounts();

    let ids = create_accounts_atomic(&mut conn, &mut accounts).unwrap();

    assert_eq!(ids.len(), accounts.len());
    assert!(accounts
        .iter()
        .zip(&ids)
        .all(|(account, id)| account.id == Some(*id) && account.date_joined.is_some()));
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    assert_eq!(Account::all(&repo).unwrap().len(), 5);
}

#[test]
fn atomic_batch_rolls_back_on_invalid_record() {
    let mut conn = session();
    let mut accounts = fixture_accounts();
    accounts[3].email = "broken".to_string();

    let err = create_accounts_atomic(&mut conn, &mut accounts).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(AccountValidationError::InvalidEmail(_))
    ));
    assert!(accounts.iter().all(|account| account.id.is_none()));
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    assert!(Account::all(&repo).unwrap().is_empty());
}

#[test]
fn accounts_survive_reopening_file_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.db");

    let created = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteAccountRepository::try_new(&conn).unwrap();
        let mut account = fixture_accounts().remove(4);
        account.create(&repo).unwrap();
        account
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let loaded = Account::find(&repo, created.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn corrupt_timestamp_is_reported_not_masked() {
    let conn = session();
    conn.execute(
        "INSERT INTO accounts (name, email, date_joined)
         VALUES ('a', 'a@example.com', 'yesterday');",
        [],
    )
    .unwrap();

    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let err = Account::all(&repo).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteAccountRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_accounts_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAccountRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("accounts"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            disabled INTEGER NOT NULL DEFAULT 0,
            date_joined TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAccountRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "accounts",
            column: "phone_number"
        })
    ));
}
