use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// API key accepted by the default state.
pub const API_KEY: &str = "test-api-key";
/// Email and password of the seeded account, accepted as Basic credentials.
pub const ACCOUNT_EMAIL: &str = "me@example.com";
pub const ACCOUNT_PASSWORD: &str = "test-password";

pub const COMPLETE_REQUEST_ID: &str = "fa5c8a0b0f492d768749333ad6fcc214c111e967";
pub const PENDING_REQUEST_ID: &str = "2f9781e1a8e2045224d808c153c2e1d3df6f8f2f";
pub const PENDING_SIGNATURE_ID: &str = "3d8aa4e0b6b1f13c5a2b69ad0db53f1b";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub email_address: String,
    pub callback_url: Option<String>,
    pub is_paid_hs: bool,
    pub is_paid_hf: bool,
    pub role_code: Option<String>,
    pub quotas: Quotas,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quotas {
    pub api_signature_requests_left: Option<i64>,
    pub documents_left: Option<i64>,
    pub templates_left: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature_request_id: String,
    pub title: String,
    pub subject: String,
    pub test_mode: bool,
    pub is_complete: bool,
    pub requester_email_address: String,
    pub created_at: i64,
    pub signatures: Vec<Signature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signature {
    pub signature_id: String,
    pub signer_email_address: String,
    pub signer_name: String,
    pub order: Option<u32>,
    pub status_code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReusableForm {
    pub reusable_form_id: String,
    pub title: String,
    pub signer_roles: Vec<SignerRole>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignerRole {
    pub name: String,
    pub order: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateAccount {
    pub email_address: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateAccount {
    pub callback_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Everything the mock serves. Tests may hold the `Db` to change it while
/// the server runs.
#[derive(Clone, Debug)]
pub struct Store {
    pub account: Account,
    pub created_accounts: Vec<Account>,
    pub signature_requests: Vec<SignatureRequest>,
    pub reusable_forms: Vec<ReusableForm>,
    /// Current PDF per signature request id.
    pub files: HashMap<String, Vec<u8>>,
    /// Signed copy per signature request id; only complete requests have one.
    pub final_copies: HashMap<String, Vec<u8>>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub api_key: String,
    pub db: Db,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            api_key: API_KEY.to_string(),
            db: Arc::new(RwLock::new(store)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Store::fixture())
    }
}

impl Store {
    pub fn fixture() -> Self {
        let complete = SignatureRequest {
            signature_request_id: COMPLETE_REQUEST_ID.to_string(),
            title: "NDA with Acme Co.".to_string(),
            subject: "The NDA we talked about".to_string(),
            test_mode: true,
            is_complete: true,
            requester_email_address: ACCOUNT_EMAIL.to_string(),
            created_at: 1_570_471_067,
            signatures: vec![Signature {
                signature_id: "78caf2a1d01cd39cea2bc1cbb340dac3".to_string(),
                signer_email_address: "jack@example.com".to_string(),
                signer_name: "Jack".to_string(),
                order: None,
                status_code: "signed".to_string(),
            }],
        };
        let pending = SignatureRequest {
            signature_request_id: PENDING_REQUEST_ID.to_string(),
            title: "Purchase order".to_string(),
            subject: "Please sign the purchase order".to_string(),
            test_mode: false,
            is_complete: false,
            requester_email_address: ACCOUNT_EMAIL.to_string(),
            created_at: 1_570_471_900,
            signatures: vec![Signature {
                signature_id: PENDING_SIGNATURE_ID.to_string(),
                signer_email_address: "jill@example.com".to_string(),
                signer_name: "Jill".to_string(),
                order: Some(0),
                status_code: "awaiting_signature".to_string(),
            }],
        };
        let reusable_forms = ["Mutual NDA", "Offer letter", "Contractor agreement"]
            .iter()
            .enumerate()
            .map(|(i, title)| ReusableForm {
                reusable_form_id: format!("form-{}", i + 1),
                title: title.to_string(),
                signer_roles: vec![SignerRole {
                    name: "Client".to_string(),
                    order: Some(0),
                }],
            })
            .collect();

        let mut files = HashMap::new();
        files.insert(COMPLETE_REQUEST_ID.to_string(), b"%PDF-1.4 nda".to_vec());
        files.insert(PENDING_REQUEST_ID.to_string(), b"%PDF-1.4 purchase order".to_vec());
        let mut final_copies = HashMap::new();
        final_copies.insert(COMPLETE_REQUEST_ID.to_string(), b"%PDF-1.4 nda signed".to_vec());

        Self {
            account: Account {
                account_id: "5008b25c7f67153e57d5a357b1687968068fb465".to_string(),
                email_address: ACCOUNT_EMAIL.to_string(),
                callback_url: None,
                is_paid_hs: true,
                is_paid_hf: false,
                role_code: None,
                quotas: Quotas {
                    api_signature_requests_left: Some(1250),
                    documents_left: None,
                    templates_left: Some(5),
                },
            },
            created_accounts: Vec::new(),
            signature_requests: vec![complete, pending],
            reusable_forms,
            files,
            final_copies,
        }
    }
}

/// An error response in the API's `{"error": {...}}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    name: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, name: &'static str, message: &str) -> Self {
        Self {
            status,
            name,
            message: message.to_string(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Not found")
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::bad_request(&error.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"error": {"error_msg": self.message, "error_name": self.name}});
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn app() -> Router {
    app_with(AppState::default())
}

pub fn app_with(state: AppState) -> Router {
    Router::new()
        .route("/v3/account", get(get_account).post(update_account))
        .route("/v3/account/create", axum::routing::post(create_account))
        .route("/v3/signature_request/list", get(list_signature_requests))
        .route("/v3/signature_request/send", axum::routing::post(send_signature_request))
        .route("/v3/signature_request/{id}", get(get_signature_request))
        .route("/v3/signature_request/files/{id}", get(get_file))
        .route("/v3/signature_request/final_copy/{id}", get(get_final_copy))
        .route("/v3/embedded/sign_url/{signature_id}", get(get_embedded_sign_url))
        .route("/v3/reusable_form/list", get(list_reusable_forms))
        .route("/v3/reusable_form/{id}", get(get_reusable_form))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

/// Accept the API key as user name, or the seeded account's email and
/// password.
fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let unauthorized = || ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized api key");
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or_else(unauthorized)?;
    let decoded = STANDARD.decode(encoded).map_err(|_| unauthorized())?;
    let decoded = String::from_utf8(decoded).map_err(|_| unauthorized())?;
    let (user, password) = decoded.split_once(':').ok_or_else(unauthorized)?;

    let api_key_ok = user == state.api_key && password.is_empty();
    let basic_ok = user == ACCOUNT_EMAIL && password == ACCOUNT_PASSWORD;
    if api_key_ok || basic_ok {
        Ok(())
    } else {
        tracing::debug!(user, "rejected credentials");
        Err(unauthorized())
    }
}

async fn get_account(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    Ok(Json(json!({"account": store.account})))
}

async fn update_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    input: Result<Form<UpdateAccount>, FormRejection>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let Form(input) = input?;
    let mut store = state.db.write().await;
    if let Some(callback_url) = input.callback_url {
        if !callback_url.starts_with("http://") && !callback_url.starts_with("https://") {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "Invalid callback_url",
            ));
        }
        store.account.callback_url = Some(callback_url);
    }
    Ok(Json(json!({"account": store.account})))
}

async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    input: Result<Form<CreateAccount>, FormRejection>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let Form(input) = input?;
    if !input.email_address.contains('@') {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "bad_request", "Invalid email address"));
    }
    if input.password.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "bad_request", "Missing password"));
    }
    let mut store = state.db.write().await;
    let exists = store.account.email_address == input.email_address
        || store
            .created_accounts
            .iter()
            .any(|a| a.email_address == input.email_address);
    if exists {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "Account already exists",
        ));
    }
    let account = Account {
        account_id: Uuid::new_v4().simple().to_string(),
        email_address: input.email_address,
        callback_url: None,
        is_paid_hs: false,
        is_paid_hf: false,
        role_code: None,
        quotas: Quotas {
            api_signature_requests_left: Some(0),
            documents_left: Some(3),
            templates_left: Some(0),
        },
    };
    store.created_accounts.push(account.clone());
    Ok(Json(json!({"account": account})))
}

async fn list_signature_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let total = store.signature_requests.len();
    Ok(Json(json!({
        "list_info": {"page": 1, "num_pages": 1, "num_results": total, "page_size": total.max(20)},
        "signature_requests": store.signature_requests,
    })))
}

async fn get_signature_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let sr = store
        .signature_requests
        .iter()
        .find(|sr| sr.signature_request_id == id)
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(json!({"signature_request": sr})))
}

/// Multipart send: `title`, `subject`, `test_mode`, `signers[i][email_address]`,
/// `signers[i][name]` and at least one `file[i]` part. The first file becomes
/// the request's current PDF.
async fn send_signature_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let mut multipart = multipart?;

    let mut text = HashMap::new();
    let mut signers: BTreeMap<usize, (Option<String>, Option<String>)> = BTreeMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name.starts_with("file[") {
            files.push(field.bytes().await?.to_vec());
            continue;
        }
        let value = field.text().await?;
        match signer_field(&name) {
            Some((index, "email_address")) => signers.entry(index).or_default().0 = Some(value),
            Some((index, "name")) => signers.entry(index).or_default().1 = Some(value),
            _ => {
                text.insert(name.clone(), value);
            }
        }
    }

    let Some(file) = files.into_iter().next() else {
        return Err(ApiError::bad_request("Must specify files to be sent"));
    };
    let signatures = signers
        .into_iter()
        .map(|(index, (email, name))| {
            let email = email.ok_or_else(|| ApiError::bad_request("Signer is missing an email address"))?;
            Ok(Signature {
                signature_id: Uuid::new_v4().simple().to_string(),
                signer_email_address: email,
                signer_name: name.unwrap_or_default(),
                order: u32::try_from(index).ok(),
                status_code: "awaiting_signature".to_string(),
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;
    if signatures.is_empty() {
        return Err(ApiError::bad_request("Must specify at least one signer"));
    }

    let sr = SignatureRequest {
        signature_request_id: Uuid::new_v4().simple().to_string(),
        title: text.get("title").cloned().unwrap_or_default(),
        subject: text.get("subject").cloned().unwrap_or_default(),
        test_mode: text.get("test_mode").is_some_and(|v| v == "1"),
        is_complete: false,
        requester_email_address: ACCOUNT_EMAIL.to_string(),
        created_at: 1_570_500_000,
        signatures,
    };
    let mut store = state.db.write().await;
    store.files.insert(sr.signature_request_id.clone(), file);
    store.signature_requests.push(sr.clone());
    tracing::debug!(id = %sr.signature_request_id, "signature request sent");
    Ok(Json(json!({"signature_request": sr})))
}

/// Split `signers[3][name]` into `(3, "name")`.
fn signer_field(name: &str) -> Option<(usize, &str)> {
    let rest = name.strip_prefix("signers[")?;
    let (index, key) = rest.split_once("][")?;
    Some((index.parse().ok()?, key.strip_suffix(']')?))
}

fn pdf(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response()
}

async fn get_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let bytes = store.files.get(&id).cloned().ok_or_else(ApiError::not_found)?;
    Ok(pdf(bytes))
}

async fn get_final_copy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    if !store.signature_requests.iter().any(|sr| sr.signature_request_id == id) {
        return Err(ApiError::not_found());
    }
    let bytes = store.final_copies.get(&id).cloned().ok_or_else(|| {
        ApiError::new(
            StatusCode::CONFLICT,
            "conflict",
            "Files are still being processed. Please try again later.",
        )
    })?;
    Ok(pdf(bytes))
}

async fn get_embedded_sign_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(signature_id): Path<String>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let signature = store
        .signature_requests
        .iter()
        .flat_map(|sr| sr.signatures.iter())
        .find(|s| s.signature_id == signature_id)
        .ok_or_else(ApiError::not_found)?;
    if signature.status_code == "signed" {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "conflict",
            "This request has already been signed",
        ));
    }
    Ok(Json(json!({
        "embedded": {
            "sign_url": format!("https://app.hellosign.com/editor/embeddedSign?signature_id={signature_id}"),
            "expires_at": 1_700_000_000,
        }
    })))
}

async fn list_reusable_forms(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let Query(query) = query?;
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);
    let offset = page
        .checked_sub(1)
        .filter(|_| page_size > 0)
        .and_then(|p| p.checked_mul(page_size))
        .ok_or_else(|| ApiError::bad_request("Invalid page"))?;
    let store = state.db.read().await;
    let total = store.reusable_forms.len();
    let forms: Vec<&ReusableForm> = store
        .reusable_forms
        .iter()
        .skip(offset)
        .take(page_size)
        .collect();
    Ok(Json(json!({
        "list_info": {
            "page": page,
            "num_pages": total.div_ceil(page_size),
            "num_results": total,
            "page_size": page_size,
        },
        "reusable_forms": forms,
    })))
}

async fn get_reusable_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let form = store
        .reusable_forms
        .iter()
        .find(|f| f.reusable_form_id == id)
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(json!({"reusable_form": form})))
}
