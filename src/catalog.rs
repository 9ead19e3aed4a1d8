//! Built-in intent catalog
//!
//! Each entry pairs a spoken pattern with the intent it triggers. Several
//! patterns (Spanish and English phrasings) map to the same intent.

use serde::{Deserialize, Serialize};

/// Intent identifiers understood by the console
pub mod intents {
    pub const OPEN_MENU: &str = "open::menu:orders";
    pub const DELETE_ORDER: &str = "delete::order";
    pub const CREATE_ORDER: &str = "create::order";
    pub const UPDATE_ORDER: &str = "update::order";
    pub const SHOW_CAPABILITIES: &str = "show::capabilities";
    pub const OPEN_TELEMETRY: &str = "open::telemetry";
    pub const EXPLAIN_ON: &str = "toggle::explain:on";
    pub const EXPLAIN_OFF: &str = "toggle::explain:off";
    pub const CONNECT_GATEWAY: &str = "mcp::connect";
    pub const LIST_RESOURCES: &str = "mcp::list:resources";
    pub const LIST_TOOLS: &str = "mcp::list:tools";
    pub const CONFIRM_LAST: &str = "confirm::last-action";
    pub const CANCEL_LAST: &str = "cancel::last-action";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub pattern: String,
    pub intent: String,
}

impl CatalogEntry {
    pub fn new(pattern: &str, intent: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            intent: intent.to_string(),
        }
    }
}

pub fn default_catalog() -> Vec<CatalogEntry> {
    use intents::*;

    let table: &[(&str, &str)] = &[
        ("abre el menú de órdenes", OPEN_MENU),
        ("abre el menú de pedidos", OPEN_MENU),
        ("open orders menu", OPEN_MENU),
        ("elimina la orden", DELETE_ORDER),
        ("borra la orden", DELETE_ORDER),
        ("delete order", DELETE_ORDER),
        ("agrega la orden", CREATE_ORDER),
        ("añade la orden", CREATE_ORDER),
        ("add the order", CREATE_ORDER),
        ("add order", CREATE_ORDER),
        ("modifica la orden", UPDATE_ORDER),
        ("actualiza la orden", UPDATE_ORDER),
        ("update the order", UPDATE_ORDER),
        ("update order", UPDATE_ORDER),
        ("muestra capacidades", SHOW_CAPABILITIES),
        ("ayuda nura", SHOW_CAPABILITIES),
        ("show capabilities", SHOW_CAPABILITIES),
        ("help panel", SHOW_CAPABILITIES),
        ("abre telemetría", OPEN_TELEMETRY),
        ("ver ranking", OPEN_TELEMETRY),
        ("open telemetry", OPEN_TELEMETRY),
        ("activa modo explain", EXPLAIN_ON),
        ("activar explain", EXPLAIN_ON),
        ("turn explain mode on", EXPLAIN_ON),
        ("desactiva modo explain", EXPLAIN_OFF),
        ("desactiva explain", EXPLAIN_OFF),
        ("turn explain mode off", EXPLAIN_OFF),
        ("conectar mcp", CONNECT_GATEWAY),
        ("connect mcp", CONNECT_GATEWAY),
        ("listar recursos", LIST_RESOURCES),
        ("list resources", LIST_RESOURCES),
        ("listar tools", LIST_TOOLS),
        ("listar herramientas", LIST_TOOLS),
        ("list tools", LIST_TOOLS),
    ];

    table
        .iter()
        .map(|(pattern, intent)| CatalogEntry::new(pattern, intent))
        .collect()
}
