//! Static tool declarations.

use crate::types::{ParamInfo, ToolInfo};

/// One declared parameter. Every value travels as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolParam {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Definition of a tool exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ToolParam],
}

impl ToolDescriptor {
    pub fn param(&self, name: &str) -> Option<&ToolParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Discovery form used by `GET /info`.
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self
                .params
                .iter()
                .map(|p| {
                    (
                        p.name.to_string(),
                        ParamInfo {
                            param_type: "string".into(),
                            description: p.description.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }
}

const fn required(name: &'static str, description: &'static str) -> ToolParam {
    ToolParam {
        name,
        description,
        required: true,
    }
}

const fn optional(name: &'static str, description: &'static str) -> ToolParam {
    ToolParam {
        name,
        description,
        required: false,
    }
}

/// Every tool, in registration order.
pub static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "initialize_session",
        description: "Initialize a Breeze API session from the login session token.",
        params: &[
            required("api_secret", "Breeze API secret key"),
            required("session_token", "Session token obtained from the Breeze login URL"),
        ],
    },
    ToolDescriptor {
        name: "connect_websocket",
        description: "Connect to the live market-data feed.",
        params: &[],
    },
    ToolDescriptor {
        name: "disconnect_websocket",
        description: "Disconnect from the live market-data feed.",
        params: &[],
    },
    ToolDescriptor {
        name: "subscribe_stock_feeds",
        description: "Subscribe to live ticks for a stock token. Requires a connected feed.",
        params: &[
            required("stock_token", "Stock token, e.g. 4.1!2885"),
            optional("interval", "Candle interval, e.g. 1second or 1minute"),
        ],
    },
    ToolDescriptor {
        name: "unsubscribe_stock_feeds",
        description: "Stop live ticks for a stock token.",
        params: &[
            required("stock_token", "Stock token, e.g. 4.1!2885"),
            optional("interval", "Candle interval used when subscribing"),
        ],
    },
    ToolDescriptor {
        name: "get_latest_ticks",
        description: "Return the latest tick for a stock token, or every cached tick.",
        params: &[optional("stock_token", "Stock token; omit for all tokens")],
    },
    ToolDescriptor {
        name: "get_customer_details",
        description: "Fetch the customer profile for an API session.",
        params: &[required("api_session", "API session token")],
    },
    ToolDescriptor {
        name: "get_demat_holdings",
        description: "Fetch demat account holdings.",
        params: &[],
    },
    ToolDescriptor {
        name: "get_funds",
        description: "Fetch available funds and margins.",
        params: &[],
    },
    ToolDescriptor {
        name: "get_historical_data",
        description: "Fetch historical OHLC candles for an instrument.",
        params: &[
            required("interval", "1minute, 5minute, 30minute or 1day"),
            required("from_date", "Start date, ISO-8601"),
            required("to_date", "End date, ISO-8601"),
            required("stock_code", "Stock code, e.g. ITC"),
            required("exchange_code", "NSE, BSE or NFO"),
            required("product_type", "cash, futures or options"),
            optional("expiry_date", "Expiry date for derivatives, ISO-8601"),
            optional("right", "call, put or others"),
            optional("strike_price", "Strike price for options"),
        ],
    },
    ToolDescriptor {
        name: "get_quotes",
        description: "Fetch the current quote for an instrument.",
        params: &[
            required("stock_code", "Stock code, e.g. ITC"),
            required("exchange_code", "NSE, BSE or NFO"),
            optional("expiry_date", "Expiry date for derivatives, ISO-8601"),
            optional("product_type", "cash, futures or options"),
            optional("right", "call, put or others"),
            optional("strike_price", "Strike price for options"),
        ],
    },
];

/// Look up a tool by name.
pub fn find_tool(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}
