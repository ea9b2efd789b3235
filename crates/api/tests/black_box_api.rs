use std::collections::HashMap;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::json;

use jurnal_api::app::{build_router, services::{AppServices, seed_accounts}};
use jurnal_api::cookies::create_cookie_key;
use jurnal_auth::Role;
use jurnal_core::{UserId, WorkspaceId};
use jurnal_infra::auth::InMemoryAuthProvider;
use jurnal_infra::store::InMemoryLedgerStore;

const PASSWORD: &str = "rahasia-bendahara";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryLedgerStore>,
    auth: Arc<InMemoryAuthProvider>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let auth = Arc::new(InMemoryAuthProvider::new(chrono::Duration::hours(1)).with_hash_cost(4));
        let services = Arc::new(AppServices::new(store.clone(), auth.clone()));

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_router(services, create_cookie_key("black-box-test-secret"), false);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            auth,
            handle,
        }
    }

    async fn user(&self, email: &str) -> UserId {
        self.auth.register(email, PASSWORD).await.unwrap().id
    }

    async fn workspace(&self, name: &str, owner: UserId) -> WorkspaceId {
        let ws = self.store.add_workspace(name, owner).unwrap();
        seed_accounts(self.store.as_ref(), ws.id).await.unwrap();
        ws.id
    }

    fn browser(&self) -> Browser {
        Browser {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap(),
            base_url: self.base_url.clone(),
            cookies: HashMap::new(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Minimal cookie-keeping client: remembers `Set-Cookie` values and drops
/// cookies the server expires.
struct Browser {
    client: reqwest::Client,
    base_url: String,
    cookies: HashMap<String, String>,
}

impl Browser {
    async fn send(&mut self, req: reqwest::RequestBuilder) -> reqwest::Response {
        let header = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        let req = if header.is_empty() { req } else { req.header(COOKIE, header) };

        let res = req.send().await.unwrap();
        for value in res.headers().get_all(SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let (pair, attributes) = raw.split_once(';').unwrap_or((raw, ""));
            let (name, value) = pair.split_once('=').unwrap();
            if attributes.contains("Max-Age=0") {
                self.cookies.remove(name.trim());
            } else {
                self.cookies.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
        res
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&mut self, path: &str) -> reqwest::Response {
        let req = self.client.get(self.url(path));
        self.send(req).await
    }

    async fn post(&mut self, path: &str, body: serde_json::Value) -> reqwest::Response {
        let req = self.client.post(self.url(path)).json(&body);
        self.send(req).await
    }

    async fn put(&mut self, path: &str, body: serde_json::Value) -> reqwest::Response {
        let req = self.client.put(self.url(path)).json(&body);
        self.send(req).await
    }

    async fn delete(&mut self, path: &str) -> reqwest::Response {
        let req = self.client.delete(self.url(path));
        self.send(req).await
    }

    async fn post_bytes(&mut self, path: &str, body: &'static str) -> reqwest::Response {
        let req = self.client.post(self.url(path)).body(body);
        self.send(req).await
    }

    async fn sign_in(&mut self, email: &str) -> serde_json::Value {
        let res = self
            .post("/auth/sign-in", json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn select(&mut self, workspace_id: WorkspaceId) -> reqwest::Response {
        self.post("/workspaces/select", json!({ "workspace_id": workspace_id.to_string() }))
            .await
    }

    async fn account_ids(&mut self) -> HashMap<String, String> {
        let res = self.get("/accounts").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| {
                (
                    a["name"].as_str().unwrap().to_string(),
                    a["id"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}

fn gaji(accounts: &HashMap<String, String>) -> serde_json::Value {
    json!({
        "description": "Gaji",
        "date": "2025-01-01",
        "lines": [
            { "account_id": accounts["Beban Gaji"], "debit": "8000000" },
            { "account_id": accounts["Kas Tunai"], "credit": "5000000" },
            { "account_id": accounts["Bank"], "credit": "3000000" },
        ],
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;
    let mut browser = server.browser();

    let res = browser.get("/health").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_redirect_to_login_without_a_session() {
    let server = TestServer::spawn().await;
    let mut browser = server.browser();

    for path in ["/workspaces", "/accounts", "/transactions"] {
        let res = browser.get(path).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(res.headers()["location"], "/login");
    }
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let server = TestServer::spawn().await;
    server.user("bendahara@kampus.ac.id").await;
    let mut browser = server.browser();

    let res = browser
        .post(
            "/auth/sign-in",
            json!({ "email": "bendahara@kampus.ac.id", "password": "salah" }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(!browser.cookies.contains_key("session"));
}

#[tokio::test]
async fn workspace_routes_need_an_active_workspace() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    let first = server.workspace("Fakultas Teknik", user).await;
    server.workspace("Fakultas Hukum", user).await;
    let mut browser = server.browser();

    // Two memberships: nothing is selected automatically.
    let signed_in = browser.sign_in("Bendahara@Kampus.ac.id ").await;
    assert!(signed_in["active_workspace_id"].is_null());

    let res = browser.get("/accounts").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_active_workspace");

    let res = browser.select(first).await;
    assert_eq!(res.status(), StatusCode::OK);

    let listed: serde_json::Value = browser.get("/workspaces").await.json().await.unwrap();
    let items = listed["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().any(|ws| ws["active"] == true && ws["role"] == "owner"));

    let res = browser.get("/accounts").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn selecting_a_foreign_workspace_is_refused() {
    let server = TestServer::spawn().await;
    let owner = server.user("owner@kampus.ac.id").await;
    let outsider = server.user("outsider@kampus.ac.id").await;
    let foreign = server.workspace("Fakultas Teknik", owner).await;
    server.workspace("Pribadi", outsider).await;
    let mut browser = server.browser();
    browser.sign_in("outsider@kampus.ac.id").await;
    let selected_before = browser.cookies.get("active_workspace").cloned();

    let res = browser.select(foreign).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_a_member");
    assert_eq!(browser.cookies.get("active_workspace").cloned(), selected_before);
}

#[tokio::test]
async fn balanced_transaction_is_saved_and_listed() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    let ws = server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();

    // Single membership: selected on sign-in.
    let signed_in = browser.sign_in("bendahara@kampus.ac.id").await;
    assert_eq!(signed_in["active_workspace_id"], ws.to_string());

    let accounts = browser.account_ids().await;
    let res = browser.post("/transactions", gaji(&accounts)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["message"], "Transaction saved.");
    assert_eq!(created["transaction"]["workspace_id"], ws.to_string());
    assert_eq!(created["transaction"]["created_by"], user.to_string());
    assert_eq!(created["transaction"]["entries"].as_array().unwrap().len(), 3);

    let listed: serde_json::Value = browser.get("/transactions").await.json().await.unwrap();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["description"], "Gaji");
    assert_eq!(listed["items"][0]["is_balanced"], true);
}

#[tokio::test]
async fn unbalanced_transaction_is_rejected_before_saving() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;
    let accounts = browser.account_ids().await;

    let draft = json!({
        "description": "Gaji",
        "date": "2025-01-01",
        "lines": [
            { "account_id": accounts["Beban Gaji"], "debit": "8000000" },
            { "account_id": accounts["Kas Tunai"], "credit": "5000000" },
        ],
    });

    let feedback: serde_json::Value = browser
        .post("/transactions/validate", draft.clone())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["valid"], false);
    assert_eq!(feedback["error"], "unbalanced");
    assert_eq!(feedback["totals"]["difference"], "3000000.00");

    let res = browser.post("/transactions", draft).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unbalanced");

    let listed: serde_json::Value = browser.get("/transactions").await.json().await.unwrap();
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn transactions_can_be_edited_and_deleted() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;
    let accounts = browser.account_ids().await;

    let created: serde_json::Value = browser
        .post("/transactions", gaji(&accounts))
        .await
        .json()
        .await
        .unwrap();
    let id = created["transaction"]["id"].as_str().unwrap().to_string();

    let mut edited = gaji(&accounts);
    edited["description"] = json!("Gaji Januari");
    let res = browser.put(&format!("/transactions/{id}"), edited).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["message"], "Transaction updated.");
    assert_eq!(updated["transaction"]["id"], id.as_str());

    let listed: serde_json::Value = browser.get("/transactions").await.json().await.unwrap();
    assert_eq!(listed["items"][0]["description"], "Gaji Januari");

    let res = browser.delete(&format!("/transactions/{id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = browser.get(&format!("/transactions/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_and_filters_by_date() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;
    let accounts = browser.account_ids().await;

    for day in 1..=12 {
        let mut draft = gaji(&accounts);
        draft["date"] = json!(format!("2025-01-{day:02}"));
        let res = browser.post("/transactions", draft).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let page: serde_json::Value = browser
        .get("/transactions?page=2&per_page=10&sort_order=asc")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 12);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["date"], "2025-01-11");

    let filtered: serde_json::Value = browser
        .get("/transactions?start_date=2025-01-03&end_date=2025-01-05")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["total"], 3);
}

#[tokio::test]
async fn removed_member_loses_the_workspace_selection() {
    let server = TestServer::spawn().await;
    let owner = server.user("owner@kampus.ac.id").await;
    let member = server.user("member@kampus.ac.id").await;
    let ws = server.workspace("Fakultas Teknik", owner).await;
    server.store.add_member(ws, member, Role::MEMBER).unwrap();

    let mut browser = server.browser();
    browser.sign_in("member@kampus.ac.id").await;
    assert!(browser.cookies.contains_key("active_workspace"));
    assert_eq!(browser.get("/accounts").await.status(), StatusCode::OK);

    server.store.remove_member(ws, member).unwrap();

    let res = browser.get("/accounts").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_a_member");
    assert!(!browser.cookies.contains_key("active_workspace"));

    let res = browser.get("/accounts").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn import_then_export() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;

    let res = browser.get("/import/template").await;
    assert_eq!(res.status(), StatusCode::OK);
    let template = res.text().await.unwrap();
    assert!(template.starts_with("Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah"));

    let sheet = "Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah\n\
                 2025-08-17,Pembelian ATK dari Toko ABC,Beban ATK,Kas Tunai,500000\n\
                 2025-08-18,Akun tidak ada,Beban Entah,Kas Tunai,1000\n\
                 2025-08-19,,Beban ATK,Kas Tunai,-5\n";

    let preview: serde_json::Value = browser
        .post_bytes("/import/preview", sheet)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(preview["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(preview["diagnostics"][0]["row_number"], 4);

    let res = browser.post_bytes("/import", sheet).await;
    assert_eq!(res.status(), StatusCode::OK);
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["message"], "1 transactions imported, 2 failed");
    assert_eq!(report["succeeded"][0]["row_number"], 2);
    assert_eq!(report["failed"][0]["row_number"], 3);
    assert_eq!(report["failed"][0]["message"], "debit account 'Beban Entah' not found");

    let res = browser.get("/export?start_date=2025-08-01&end_date=2025-08-31").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let csv = res.text().await.unwrap();
    assert!(csv.contains("Pembelian ATK dari Toko ABC,Beban ATK,Debit,500000.00"));
    assert!(csv.contains("Pembelian ATK dari Toko ABC,Kas Tunai,Kredit,500000.00"));

    let empty: serde_json::Value = browser
        .get("/export?start_date=2024-01-01&end_date=2024-01-31")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(empty["message"], "no transactions to export");
}

#[tokio::test]
async fn sign_out_ends_the_session() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;
    let stolen = browser.cookies.clone();

    let res = browser.post("/auth/sign-out", json!({})).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(browser.cookies.is_empty());

    // The old cookie no longer resolves to a session.
    browser.cookies = stolen;
    let res = browser.get("/accounts").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn summary_reports_net_income() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;
    let accounts = browser.account_ids().await;

    let draft = json!({
        "description": "Jasa konsultasi",
        "date": "2025-02-01",
        "lines": [
            { "account_id": accounts["Bank"], "debit": "2000000" },
            { "account_id": accounts["Pendapatan Jasa"], "credit": "2000000" },
        ],
    });
    assert_eq!(browser.post("/transactions", draft).await.status(), StatusCode::CREATED);

    let summary: serde_json::Value = browser.get("/summary").await.json().await.unwrap();
    assert_eq!(summary["is_balanced"], true);
    assert_eq!(summary["net_income"], "2000000.00");
}

#[tokio::test]
async fn categories_are_managed_per_workspace() {
    let server = TestServer::spawn().await;
    let user = server.user("bendahara@kampus.ac.id").await;
    server.workspace("Fakultas Teknik", user).await;
    let staff = server.user("staf@kampus.ac.id").await;
    server.workspace("Fakultas Hukum", staff).await;
    let mut browser = server.browser();
    browser.sign_in("bendahara@kampus.ac.id").await;

    let res = browser.post("/categories", json!({ "name": "Transportasi" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    for (name, kind) in [("Transportasi", "expense"), ("SPP", "income")] {
        let res = browser.post("/categories", json!({ "name": name, "type": kind })).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let listed: serde_json::Value = browser.get("/categories").await.json().await.unwrap();
    let items = listed["items"].as_array().unwrap();
    let names: Vec<&str> = items.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["SPP", "Transportasi"]);
    assert_eq!(items[1]["type"], "expense");
    let spp = items[0]["id"].as_str().unwrap().to_string();

    let mut other = server.browser();
    other.sign_in("staf@kampus.ac.id").await;
    let res = other.delete(&format!("/categories/{spp}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let theirs: serde_json::Value = other.get("/categories").await.json().await.unwrap();
    assert!(theirs["items"].as_array().unwrap().is_empty());

    let res = browser.delete(&format!("/categories/{spp}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let listed: serde_json::Value = browser.get("/categories").await.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);
}
