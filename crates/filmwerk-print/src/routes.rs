// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Route resolver: maps a (calling AE, called AE) pair to a print profile.
//
// Routes live in a JSON file:
//
//   { "routes": [ { "caller": "CT01", "called": "FILMWERK",
//                   "printerName": "Film Laser", "duplex": "longedge",
//                   "forcePaperSize": "14INX17IN", "forceTray": "Tray 2",
//                   "fitToPage": true, "sendEventReports": false } ] }
//
// Property names are matched case-insensitively.  The parsed file is cached
// and only re-read when its modification time moves forward; a file that
// fails to read or parse leaves the previous cache in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::types::DuplexMode;

// ---------------------------------------------------------------------------
// Route model
// ---------------------------------------------------------------------------

/// One caller/called → output profile mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteItem {
    pub caller: String,
    pub called: String,
    pub printer_name: String,
    pub duplex: Option<String>,
    pub force_paper_size: Option<String>,
    pub force_tray: Option<String>,
    pub fit_to_page: Option<bool>,
    pub send_event_reports: Option<bool>,
}

impl RouteItem {
    /// Duplex mode requested by the route; `None` keeps the device default.
    pub fn duplex_mode(&self) -> Option<DuplexMode> {
        self.duplex.as_deref().and_then(DuplexMode::from_token)
    }

    pub fn fit_to_page(&self) -> bool {
        self.fit_to_page.unwrap_or(true)
    }

    pub fn send_event_reports(&self) -> bool {
        self.send_event_reports.unwrap_or(false)
    }

    fn matches(&self, caller: &str, called: &str) -> bool {
        self.caller.eq_ignore_ascii_case(caller) && self.called.eq_ignore_ascii_case(called)
    }
}

/// The whole routes file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub routes: Vec<RouteItem>,
}

impl RoutingConfig {
    /// Parse a routes document, matching property names case-insensitively.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(serde_json::from_value(canonical_keys(value))?)
    }

    /// First route whose caller and called titles match, ignoring case.
    pub fn find(&self, caller: &str, called: &str) -> Option<&RouteItem> {
        self.routes.iter().find(|r| r.matches(caller, called))
    }
}

const KNOWN_KEYS: [&str; 9] = [
    "routes",
    "caller",
    "called",
    "printerName",
    "duplex",
    "forcePaperSize",
    "forceTray",
    "fitToPage",
    "sendEventReports",
];

/// Rewrite object keys to their canonical spelling, recursively.
fn canonical_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    let key = KNOWN_KEYS
                        .iter()
                        .find(|known| known.eq_ignore_ascii_case(&key))
                        .map(|known| known.to_string())
                        .unwrap_or(key);
                    (key, canonical_keys(v))
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_keys).collect()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// Directories searched for the routes file, in order.
#[derive(Debug, Clone, Default)]
pub struct RouteLocations {
    pub deployment_root: Option<PathBuf>,
    /// Directory of the running executable.
    pub app_base: PathBuf,
    pub data_dir: Option<PathBuf>,
}

impl RouteLocations {
    /// First candidate holding `file_name`, else the application base path.
    pub fn locate(&self, file_name: &str) -> PathBuf {
        let candidates = self
            .deployment_root
            .iter()
            .chain(std::iter::once(&self.app_base))
            .chain(self.data_dir.iter())
            .map(|dir| dir.join(file_name));

        for candidate in candidates {
            if candidate.is_file() {
                info!(path = %candidate.display(), "using routes file");
                return candidate;
            }
        }

        let fallback = self.app_base.join(file_name);
        warn!(path = %fallback.display(), "routes file not found, falling back to application base");
        fallback
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RouteCache {
    config: Arc<RoutingConfig>,
    loaded: bool,
    mtime: Option<SystemTime>,
}

/// Cached, reload-on-change view of a routes file.
///
/// Shared by every connection of a server; resolution never fails, it only
/// degrades to "no route" or a stale table.
pub struct RouteResolver {
    path: PathBuf,
    cache: Mutex<RouteCache>,
}

impl RouteResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(RouteCache::default()),
        }
    }

    /// Resolver over the first routes file found in `locations`.
    pub fn locate(locations: &RouteLocations, file_name: &str) -> Self {
        Self::new(locations.locate(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current routing table, re-reading the file if it changed.
    pub fn load(&self) -> Arc<RoutingConfig> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        let mtime = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.modified().ok(),
            Err(_) => {
                debug!(path = %self.path.display(), "routes file not found");
                return Arc::clone(&cache.config);
            }
        };

        let stale = !cache.loaded
            || match (mtime, cache.mtime) {
                (Some(now), Some(seen)) => now > seen,
                _ => false,
            };
        if stale {
            match self.read() {
                Ok(config) => {
                    info!(path = %self.path.display(), routes = config.routes.len(), "routes loaded");
                    cache.config = Arc::new(config);
                    cache.loaded = true;
                    cache.mtime = mtime;
                }
                Err(e) => warn!(path = %self.path.display(), error = %e, "error reading routes file"),
            }
        }
        Arc::clone(&cache.config)
    }

    /// Route for a caller/called pair.
    pub fn resolve(&self, caller: &str, called: &str) -> Option<RouteItem> {
        self.load().find(caller, called).cloned()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read(&self) -> Result<RoutingConfig> {
        let text = std::fs::read_to_string(&self.path)?;
        RoutingConfig::from_json(&text)
            .map_err(|e| FilmwerkError::Routing(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    const ROUTES: &str = r#"{
        "Routes": [
            { "CALLER": "ct01", "called": "FILMWERK", "PrinterName": "Film Laser",
              "duplex": "LongEdge", "forcePaperSize": "14INX17IN", "FitToPage": false },
            { "caller": "CT01", "called": "FILMWERK", "printerName": "Shadowed" },
            { "caller": "MR02", "called": "FILMWERK", "printerName": "Office", "sendEventReports": true }
        ]
    }"#;

    fn write_routes(path: &Path, text: &str, mtime: SystemTime) {
        std::fs::write(path, text).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn case_insensitive_keys_and_lookup() {
        let config = RoutingConfig::from_json(ROUTES).unwrap();
        assert_eq!(config.routes.len(), 3);

        let route = config.find("CT01", "filmwerk").unwrap();
        assert_eq!(route.printer_name, "Film Laser");
        assert_eq!(route.duplex_mode(), Some(DuplexMode::LongEdge));
        assert_eq!(route.force_paper_size.as_deref(), Some("14INX17IN"));
        assert!(!route.fit_to_page());
        assert!(!route.send_event_reports());

        let mr = config.find("mr02", "FILMWERK").unwrap();
        assert!(mr.fit_to_page());
        assert!(mr.send_event_reports());

        assert!(config.find("CT01", "OTHER").is_none());
    }

    #[test]
    fn missing_file_resolves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = RouteResolver::new(tmp.path().join("routes.json"));
        assert!(resolver.resolve("CT01", "FILMWERK").is_none());
    }

    #[test]
    fn reloads_only_when_mtime_advances() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("routes.json");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        write_routes(&path, ROUTES, t1);

        let resolver = RouteResolver::new(&path);
        assert_eq!(resolver.resolve("ct01", "filmwerk").unwrap().printer_name, "Film Laser");

        let replaced = r#"{ "routes": [ { "caller": "CT01", "called": "FILMWERK", "printerName": "New" } ] }"#;
        write_routes(&path, replaced, t1);
        assert_eq!(resolver.resolve("CT01", "FILMWERK").unwrap().printer_name, "Film Laser");

        write_routes(&path, replaced, t1 + Duration::from_secs(5));
        assert_eq!(resolver.resolve("CT01", "FILMWERK").unwrap().printer_name, "New");
    }

    #[test]
    fn broken_file_keeps_previous_routes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("routes.json");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        write_routes(&path, ROUTES, t1);

        let resolver = RouteResolver::new(&path);
        assert!(resolver.resolve("MR02", "FILMWERK").is_some());

        write_routes(&path, "{ not json", t1 + Duration::from_secs(5));
        assert!(resolver.resolve("MR02", "FILMWERK").is_some());

        std::fs::remove_file(&path).unwrap();
        assert!(resolver.resolve("MR02", "FILMWERK").is_some());
    }

    #[test]
    fn locations_are_searched_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let base = tmp.path().join("base");
        let data = tmp.path().join("data");
        for dir in [&root, &base, &data] {
            std::fs::create_dir_all(dir).unwrap();
        }
        let locations = RouteLocations {
            deployment_root: Some(root.clone()),
            app_base: base.clone(),
            data_dir: Some(data.clone()),
        };

        assert_eq!(locations.locate("routes.json"), base.join("routes.json"));

        std::fs::write(data.join("routes.json"), "{}").unwrap();
        assert_eq!(locations.locate("routes.json"), data.join("routes.json"));

        std::fs::write(base.join("routes.json"), "{}").unwrap();
        assert_eq!(locations.locate("routes.json"), base.join("routes.json"));

        std::fs::write(root.join("routes.json"), "{}").unwrap();
        let resolver = RouteResolver::locate(&locations, "routes.json");
        assert_eq!(resolver.path(), root.join("routes.json"));
    }

    #[test]
    fn concurrent_resolution_sees_whole_tables_during_reloads() {
        const VERSIONS: u64 = 40;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("routes.json");
        // Ahead of the wall clock, so a half-finished write never looks newer.
        let base = SystemTime::now() + Duration::from_secs(86_400);
        let table = |version: u64| {
            format!(
                r#"{{ "routes": [
                    {{ "caller": "CT01", "called": "FILMWERK", "printerName": "v{version}" }},
                    {{ "caller": "MR02", "called": "FILMWERK", "printerName": "v{version}" }}
                ] }}"#
            )
        };
        write_routes(&path, &table(0), base);
        let resolver = RouteResolver::new(&path);

        let writer_finished = std::sync::atomic::AtomicBool::new(false);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for version in 1..=VERSIONS {
                    write_routes(&path, &table(version), base + Duration::from_secs(version));
                    std::thread::sleep(Duration::from_millis(2));
                }
                writer_finished.store(true, std::sync::atomic::Ordering::Release);
            });

            for _ in 0..2 {
                scope.spawn(|| {
                    let mut last_seen = 0;
                    while !writer_finished.load(std::sync::atomic::Ordering::Acquire) {
                        let config = resolver.load();
                        assert_eq!(config.routes.len(), 2);
                        let first = &config.routes[0].printer_name;
                        assert_eq!(first, &config.routes[1].printer_name);
                        let version: u64 = first.trim_start_matches('v').parse().unwrap();
                        assert!(version >= last_seen);
                        last_seen = version;

                        assert!(resolver.resolve("ct01", "filmwerk").is_some());
                    }
                });
            }
        });

        assert_eq!(resolver.resolve("MR02", "FILMWERK").unwrap().printer_name, format!("v{VERSIONS}"));
    }
}
