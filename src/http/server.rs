use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::{
    auth::AuthService,
    config::HttpConfig,
    domain::library::{Item, Library},
    http::error::ApiError,
    media::{
        service::{MediaService, UploadFile},
        walk::{FileEntry, SubdirEntry},
    },
};

pub struct HttpServer {
    media: MediaService,
    auth: AuthService,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(media: MediaService, auth: AuthService, config: HttpConfig) -> Self {
        Self {
            media,
            auth,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (POST) (/api/auth/register) => {
                Self::respond(self.handle_register(request))
            },

            (POST) (/api/auth/login) => {
                Self::respond(self.handle_login(request))
            },

            (GET) (/api/libraries) => {
                Self::respond(self.handle_list_libraries(request))
            },

            (POST) (/api/libraries) => {
                Self::respond(self.handle_create_library(request))
            },

            (DELETE) (/api/libraries/{id: i64}) => {
                Self::respond(self.handle_delete_library(request, id))
            },

            (POST) (/api/libraries/{id: i64}/scan) => {
                Self::respond(self.handle_scan(request, id))
            },

            (POST) (/api/libraries/{id: i64}/upload) => {
                Self::respond(self.handle_upload(request, id))
            },

            (GET) (/api/browse/directories) => {
                Self::respond(self.handle_browse_directories(request))
            },

            (GET) (/api/browse/files) => {
                Self::respond(self.handle_browse_files(request))
            },

            (GET) (/api/items/{id: i64}/file) => {
                Self::respond(self.handle_item_file(request, id))
            },

            _ => self.handle_static(request)
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn respond(result: Result<Response, ApiError>) -> Response {
        result.unwrap_or_else(ApiError::into_response)
    }

    fn authorize(&self, request: &Request) -> Result<(), ApiError> {
        self.auth.verify_bearer(request.header("Authorization"))?;
        Ok(())
    }

    fn json_body<T: serde::de::DeserializeOwned>(request: &Request) -> Result<T, ApiError> {
        rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
    }

    fn handle_register(&self, request: &Request) -> Result<Response, ApiError> {
        let body: CredentialsRequest = Self::json_body(request)?;
        let user = self.auth.register(&body.username, &body.password)?;

        Ok(Response::json(&UserResponse {
            id: user.id,
            username: user.username,
        }))
    }

    fn handle_login(&self, request: &Request) -> Result<Response, ApiError> {
        let body: CredentialsRequest = Self::json_body(request)?;
        let token = self.auth.login(&body.username, &body.password)?;

        Ok(Response::json(&TokenResponse { token }))
    }

    fn handle_list_libraries(&self, request: &Request) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let libraries = self.media.list_libraries()?;
        let body: Vec<_> = libraries.iter().map(LibraryResponse::from_domain).collect();
        Ok(Response::json(&body))
    }

    fn handle_create_library(&self, request: &Request) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let body: CreateLibraryRequest = Self::json_body(request)?;
        let library = self.media.create_library(&body.name, &body.path)?;
        Ok(Response::json(&LibraryResponse::from_domain(&library)))
    }

    fn handle_delete_library(&self, request: &Request, id: i64) -> Result<Response, ApiError> {
        self.authorize(request)?;

        self.media.delete_library(id)?;
        Ok(Response::empty_204())
    }

    fn handle_scan(&self, request: &Request, id: i64) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let added = self.media.scan_library(id)?;
        Ok(Response::json(&AddedResponse { added }))
    }

    fn handle_upload(&self, request: &Request, id: i64) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let mut form = rouille::input::multipart::get_multipart_input(request)
            .map_err(|_| ApiError::BadRequest("expected multipart/form-data".into()))?;

        let mut files = Vec::new();
        while let Some(mut field) = form.next() {
            if &*field.headers.name != "files" {
                continue;
            }
            let relative_name = match field.headers.filename.clone() {
                Some(name) if !name.is_empty() => name,
                _ => {
                    log::warn!("skipping upload part without a filename");
                    continue;
                }
            };

            let mut bytes = Vec::new();
            if let Err(e) = field.data.read_to_end(&mut bytes) {
                log::warn!("could not read upload part {relative_name:?}: {e}");
                continue;
            }
            files.push(UploadFile {
                relative_name,
                bytes,
            });
        }

        let added = self.media.ingest_uploads(files, id)?;
        Ok(Response::json(&AddedResponse { added }))
    }

    fn handle_browse_directories(&self, request: &Request) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let path = request.get_param("path").unwrap_or_default();
        let entries = self.media.list_subdirectories(&path)?;
        let body: Vec<_> = entries.iter().map(SubdirResponse::from_domain).collect();
        Ok(Response::json(&body))
    }

    fn handle_browse_files(&self, request: &Request) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let path = request.get_param("path").unwrap_or_default();
        let entries = self.media.list_files(&path)?;
        let body: Vec<_> = entries.iter().map(FileResponse::from_domain).collect();
        Ok(Response::json(&body))
    }

    fn handle_item_file(&self, request: &Request, id: i64) -> Result<Response, ApiError> {
        self.authorize(request)?;

        let item = self.media.find_item(id)?;
        let mime = mime_guess::from_path(&item.filepath)
            .first_or_octet_stream()
            .to_string();

        let file = std::fs::File::open(&item.filepath)
            .map_err(|_| ApiError::NotFound(format!("no file on disk for item {id}")))?;
        log::debug!(
            "FILE {} -> 200 OK, path: {}, MIME type: {}",
            id,
            item.filepath.to_string_lossy(),
            mime
        );

        Ok(Response::from_file(mime, file))
    }

    /// Serves the bundled frontend. Unknown non-API paths fall back to the
    /// SPA entrypoint so client-side routes survive a page reload.
    fn handle_static(&self, request: &Request) -> Response {
        let Some(assets_dir) = &self.config.assets_dir else {
            return Response::empty_404();
        };
        if request.method() != "GET" || request.url().starts_with("/api/") {
            return Response::empty_404();
        }

        let response = rouille::match_assets(request, assets_dir);
        if response.status_code != 404 {
            return response;
        }

        match std::fs::read_to_string(assets_dir.join("index.html")) {
            Ok(body) => Response::html(body),
            Err(_) => Response::empty_404(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryResponse {
    id: i64,
    name: String,
    path: String,
    items: Vec<ItemResponse>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse {
    id: i64,
    filename: String,
    filepath: String,
    size: u64,
    duration: Option<String>,
}

impl LibraryResponse {
    fn from_domain(library: &Library) -> Self {
        Self {
            id: library.id,
            name: library.name.clone(),
            path: library.path.to_string_lossy().into_owned(),
            items: library.items.iter().map(ItemResponse::from_domain).collect(),
        }
    }
}

impl ItemResponse {
    fn from_domain(item: &Item) -> Self {
        Self {
            id: item.id,
            filename: item.filename.clone(),
            filepath: item.filepath.to_string_lossy().into_owned(),
            size: item.size,
            duration: item.duration.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubdirResponse {
    name: String,
    relative_path: String,
}

impl SubdirResponse {
    fn from_domain(entry: &SubdirEntry) -> Self {
        Self {
            name: entry.name.clone(),
            relative_path: entry.relative_path.to_string_lossy().into_owned(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResponse {
    name: String,
    relative_path: String,
    size: u64,
}

impl FileResponse {
    fn from_domain(entry: &FileEntry) -> Self {
        Self {
            name: entry.name.clone(),
            relative_path: entry.relative_path.to_string_lossy().into_owned(),
            size: entry.size,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CreateLibraryRequest {
    name: String,
    path: String,
}

#[derive(Serialize, Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize, Deserialize)]
struct UserResponse {
    id: i64,
    username: String,
}

#[derive(Serialize, Deserialize)]
struct AddedResponse {
    added: usize,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
