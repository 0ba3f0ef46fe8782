use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which of the two input tables an uploaded file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Infrastructure,
    Commercial,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown table role '{0}' (expected 'infrastructure' or 'commercial')")]
pub struct UnknownTableRole(pub String);

impl TableRole {
    pub const ALL: [TableRole; 2] = [TableRole::Infrastructure, TableRole::Commercial];

    /// Header names a table of this role must carry.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            TableRole::Infrastructure => &[
                "ID_Trafo",
                "Sector",
                "Latitud",
                "Longitud",
                "Capacidad_kVA",
                "kWh_Entregado",
            ],
            TableRole::Commercial => &[
                "ID_Trafo",
                "kWh_Facturado",
                "Clientes_Directos",
                "Recaudacion_DOP",
            ],
        }
    }

    /// Required columns absent from `headers`, in declaration order.
    pub fn missing_columns(self, headers: &[&str]) -> Vec<&'static str> {
        self.required_columns()
            .iter()
            .copied()
            .filter(|col| !headers.contains(col))
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableRole::Infrastructure => "infrastructure",
            TableRole::Commercial => "commercial",
        }
    }
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableRole {
    type Err = UnknownTableRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infrastructure" | "infra" => Ok(TableRole::Infrastructure),
            "commercial" | "com" => Ok(TableRole::Commercial),
            other => Err(UnknownTableRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_every_absent_header() {
        let headers = ["ID_Trafo", "kWh_Facturado"];
        let missing = TableRole::Commercial.missing_columns(&headers);
        assert_eq!(missing, vec!["Clientes_Directos", "Recaudacion_DOP"]);
    }

    #[test]
    fn role_parses_short_and_long_names() {
        assert_eq!("infra".parse::<TableRole>(), Ok(TableRole::Infrastructure));
        assert_eq!(" Commercial ".parse::<TableRole>(), Ok(TableRole::Commercial));
        assert!("billing".parse::<TableRole>().is_err());
    }
}
