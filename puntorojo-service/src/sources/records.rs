use csv::StringRecord;
use puntorojo_domain::{CommercialRecord, InfrastructureRecord, TableRole, TransformerId};

/// A typed row that can be decoded from a header-addressed table record.
pub trait TableRow: Sized + Send + 'static {
    const ROLE: TableRole;

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String>;

    fn transformer_id(&self) -> &TransformerId;

    /// Cell values in the order of `ROLE.required_columns()`, for previews.
    fn cells(&self) -> Vec<String>;
}

/// Header-name lookup over one record.
struct Columns<'a> {
    record: &'a StringRecord,
    headers: &'a StringRecord,
}

impl<'a> Columns<'a> {
    fn get(&self, name: &str) -> Result<&'a str, String> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| self.record.get(idx))
            .map(str::trim)
            .ok_or_else(|| format!("missing column '{name}'"))
    }

    fn number(&self, name: &str) -> Result<f64, String> {
        let raw = self.get(name)?;
        raw.parse()
            .map_err(|e| format!("invalid {name} '{raw}': {e}"))
    }

    /// Non-negative integer; whole-number floats such as `60.0` are accepted.
    fn count(&self, name: &str) -> Result<u32, String> {
        let raw = self.get(name)?;
        if let Ok(n) = raw.parse::<u32>() {
            return Ok(n);
        }
        match raw.parse::<f64>() {
            Ok(n) if n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&n) => Ok(n as u32),
            Ok(_) => Err(format!("invalid {name} '{raw}': expected a whole number")),
            Err(e) => Err(format!("invalid {name} '{raw}': {e}")),
        }
    }
}

impl TableRow for InfrastructureRecord {
    const ROLE: TableRole = TableRole::Infrastructure;

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String> {
        let cols = Columns { record, headers };

        Ok(InfrastructureRecord {
            transformer_id: TransformerId::new(cols.get("ID_Trafo")?),
            sector: cols.get("Sector")?.to_string(),
            latitude: cols.number("Latitud")?,
            longitude: cols.number("Longitud")?,
            capacity_kva: cols.number("Capacidad_kVA")?,
            delivered_kwh: cols.number("kWh_Entregado")?,
        })
    }

    fn transformer_id(&self) -> &TransformerId {
        &self.transformer_id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.transformer_id.to_string(),
            self.sector.clone(),
            self.latitude.to_string(),
            self.longitude.to_string(),
            self.capacity_kva.to_string(),
            self.delivered_kwh.to_string(),
        ]
    }
}

impl TableRow for CommercialRecord {
    const ROLE: TableRole = TableRole::Commercial;

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String> {
        let cols = Columns { record, headers };

        Ok(CommercialRecord {
            transformer_id: TransformerId::new(cols.get("ID_Trafo")?),
            billed_kwh: cols.number("kWh_Facturado")?,
            direct_customers: cols.count("Clientes_Directos")?,
            revenue_dop: cols.number("Recaudacion_DOP")?,
        })
    }

    fn transformer_id(&self) -> &TransformerId {
        &self.transformer_id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.transformer_id.to_string(),
            self.billed_kwh.to_string(),
            self.direct_customers.to_string(),
            self.revenue_dop.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_infrastructure_row_by_header_name() {
        let headers = StringRecord::from(vec![
            "kWh_Entregado",
            "ID_Trafo",
            "Sector",
            "Latitud",
            "Longitud",
            "Capacidad_kVA",
        ]);
        let record = StringRecord::from(vec!["2000", " 1 ", "Gazcue", "18.4691", "-69.9303", "100"]);

        let row = InfrastructureRecord::from_record(&record, &headers).unwrap();
        assert_eq!(row.transformer_id, TransformerId::from("1"));
        assert_eq!(row.sector, "Gazcue");
        assert_eq!(row.delivered_kwh, 2000.0);
        assert_eq!(row.longitude, -69.9303);
    }

    #[test]
    fn reports_unparseable_customer_count() {
        let headers = StringRecord::from(vec![
            "ID_Trafo",
            "kWh_Facturado",
            "Clientes_Directos",
            "Recaudacion_DOP",
        ]);
        let record = StringRecord::from(vec!["1", "1000", "many", "50000"]);

        let err = CommercialRecord::from_record(&record, &headers).unwrap_err();
        assert!(err.contains("Clientes_Directos"), "{err}");
    }

    fn commercial_headers() -> StringRecord {
        StringRecord::from(vec!["ID_Trafo", "kWh_Facturado", "Clientes_Directos", "Recaudacion_DOP"])
    }

    #[test]
    fn whole_float_customer_count_is_accepted() {
        let record = StringRecord::from(vec!["1", "1000", "60.0", "50000"]);

        let row = CommercialRecord::from_record(&record, &commercial_headers()).unwrap();
        assert_eq!(row.direct_customers, 60);
    }

    #[test]
    fn fractional_customer_count_is_rejected() {
        let record = StringRecord::from(vec!["1", "1000", "60.5", "50000"]);

        let err = CommercialRecord::from_record(&record, &commercial_headers()).unwrap_err();
        assert_eq!(err, "invalid Clientes_Directos '60.5': expected a whole number");

        let record = StringRecord::from(vec!["1", "1000", "-3.0", "50000"]);
        assert!(CommercialRecord::from_record(&record, &commercial_headers()).is_err());
    }

    #[test]
    fn short_record_reports_missing_column() {
        let headers = StringRecord::from(vec!["ID_Trafo", "kWh_Facturado", "Clientes_Directos", "Recaudacion_DOP"]);
        let record = StringRecord::from(vec!["1", "1000"]);

        let err = CommercialRecord::from_record(&record, &headers).unwrap_err();
        assert_eq!(err, "missing column 'Clientes_Directos'");
    }
}
