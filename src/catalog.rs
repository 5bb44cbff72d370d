use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Route {
    pub id: &'static str,
    pub name: &'static str,
}

/// Commuter corridors a trip may be tagged with, in display order.
pub const ROUTES: &[Route] = &[
    Route { id: "boyaca", name: "Boyacá" },
    Route { id: "autopista", name: "Autopista Norte" },
    Route { id: "septima", name: "7ma" },
    Route { id: "novena", name: "9na" },
    Route { id: "zipa", name: "Zipa" },
    Route { id: "heroes", name: "Héroes" },
    Route { id: "suba", name: "Suba" },
    Route { id: "mosquera", name: "Mosquera" },
    Route { id: "calle80", name: "Calle 80" },
    Route { id: "chia", name: "Chía" },
];

pub fn list_routes() -> &'static [Route] {
    ROUTES
}

pub fn is_valid_route(tag: &str) -> bool {
    find_route(tag).is_some()
}

pub fn find_route(tag: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.id == tag)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    #[serde(rename = "nequi")]
    Nequi,
    #[serde(rename = "daviplata")]
    Daviplata,
    #[serde(rename = "efectivo")]
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Nequi,
        PaymentMethod::Daviplata,
        PaymentMethod::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Nequi => "nequi",
            PaymentMethod::Daviplata => "daviplata",
            PaymentMethod::Cash => "efectivo",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == raw)
    }
}

pub fn payment_method_names() -> Vec<&'static str> {
    PaymentMethod::ALL.iter().map(PaymentMethod::as_str).collect()
}
