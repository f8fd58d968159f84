//! Census exports.
//!
//! - [`export_json`]: the whole date → record map, pretty printed
//! - [`export_csv`]: one day as a spreadsheet: a row per occupied or blocked bed, a row per
//!   occupied clinical crib, then the discharge and transfer blocks

use crate::catalog::{BedCatalog, BedDefinition};
use crate::constants::CRIB_ROW_ID_SUFFIX;
use crate::patient::{DeviceInfo, Occupant, PatientData};
use crate::record::{DailyRecord, RecordMap};
use crate::{CensusError, CensusResult};

pub const CSV_HEADERS: [&str; 37] = [
    "ID Cama",
    "Nombre Cama",
    "Ubicación",
    "Tipo Cama",
    "Mobiliario",
    "Cuna RN Sano",
    "Bloqueada",
    "Motivo Bloqueo",
    "Paciente",
    "Tipo Doc",
    "RUT/Pasaporte",
    "F. Nacimiento",
    "Edad",
    "Sexo",
    "Previsión",
    "Origen Ingreso",
    "Detalle Origen",
    "Cond. Permanencia",
    "Rapanui",
    "Diagnóstico",
    "Comentarios Dx",
    "Especialidad",
    "Estado",
    "F. Ingreso",
    "Brazalete",
    "Postrado",
    "Dispositivos",
    "CUP F.Instalación",
    "CUP F.Retiro",
    "CVC F.Instalación",
    "CVC F.Retiro",
    "VMI F.Inicio",
    "VMI F.Término",
    "Comp. Qx",
    "UPC",
    "Nota Entrega",
    "Enfermero/a",
];

const DISCHARGE_HEADER: &str = "Cama,Tipo,Paciente,RUT,Diagnóstico,Estado,Edad,Previsión";
const TRANSFER_HEADER: &str =
    "Cama,Tipo,Paciente,RUT,Diagnóstico,Medio,Centro,Acompañante,Edad,Previsión";

/// Type label of clinical crib rows.
const CRIB_ROW_TYPE: &str = "Cuna";

pub fn export_json(records: &RecordMap) -> CensusResult<String> {
    serde_json::to_string_pretty(records).map_err(CensusError::Serialization)
}

/// Suggested file name of a CSV export.
pub fn csv_file_name(record: &DailyRecord) -> String {
    format!("Censo_HangaRoa_{}.csv", record.key())
}

/// Render one day's census as CSV.
///
/// Vacant, unblocked beds are skipped. Lines are joined with `\n`.
pub fn export_csv(catalog: &BedCatalog, record: &DailyRecord) -> String {
    let nurses = nurse_field(record);
    let mut rows = vec![CSV_HEADERS.join(",")];

    for bed in catalog.all() {
        let Some(slot) = record.beds.get(&bed.id) else {
            continue;
        };
        if slot.main.is_blocked || slot.main.is_occupied() {
            rows.push(bed_row(bed, slot, &nurses));
        }
        if let Some(crib) = slot.occupied_crib() {
            rows.push(crib_row(bed, slot, crib, &nurses));
        }
    }

    if !record.discharges.is_empty() {
        rows.push("\n--- ALTAS ---".into());
        rows.push(DISCHARGE_HEADER.into());
        for d in &record.discharges {
            rows.push(
                [
                    d.bed_name.clone(),
                    d.bed_type.clone(),
                    quoted(&d.patient_name),
                    d.rut.clone(),
                    quoted(&d.diagnosis),
                    d.status.label().to_string(),
                    d.age.clone(),
                    d.insurance.map(|i| i.label()).unwrap_or_default().to_string(),
                ]
                .join(","),
            );
        }
    }

    if !record.transfers.is_empty() {
        rows.push("\n--- TRASLADOS ---".into());
        rows.push(TRANSFER_HEADER.into());
        for t in &record.transfers {
            rows.push(
                [
                    t.bed_name.clone(),
                    t.bed_type.clone(),
                    quoted(&t.patient_name),
                    t.rut.clone(),
                    quoted(&t.diagnosis),
                    t.evacuation_method.clone(),
                    quoted(t.center_label()),
                    quoted(t.transfer_escort.as_deref().unwrap_or_default()),
                    t.age.clone(),
                    t.insurance.map(|i| i.label()).unwrap_or_default().to_string(),
                ]
                .join(","),
            );
        }
    }

    rows.join("\n")
}

fn bed_row(bed: &BedDefinition, slot: &PatientData, nurses: &str) -> String {
    occupant_row(
        &bed.id,
        &bed.name,
        bed.bed_type.as_str(),
        &slot.main,
        &slot.main.location,
        nurses,
    )
}

fn crib_row(bed: &BedDefinition, slot: &PatientData, crib: &Occupant, nurses: &str) -> String {
    let location = if slot.main.location.is_empty() {
        &crib.location
    } else {
        &slot.main.location
    };
    occupant_row(
        &format!("{}{}", bed.id, CRIB_ROW_ID_SUFFIX),
        &format!("{} (Cuna Clínica)", bed.name),
        CRIB_ROW_TYPE,
        crib,
        location,
        nurses,
    )
}

fn occupant_row(
    id: &str,
    name: &str,
    bed_type: &str,
    p: &Occupant,
    location: &str,
    nurses: &str,
) -> String {
    let details = p.device_details.as_ref();
    let cup = details.and_then(|d| d.cup.as_ref());
    let cvc = details.and_then(|d| d.cvc.as_ref());
    let vmi = details.and_then(|d| d.vmi.as_ref());

    let fields: [String; 37] = [
        id.to_string(),
        name.to_string(),
        location.to_string(),
        bed_type.to_string(),
        p.bed_mode.label().to_string(),
        yes_no(p.has_companion_crib),
        yes_no(p.is_blocked),
        p.blocked_reason.clone(),
        p.patient_name.clone(),
        p.document_type.label().to_string(),
        p.rut.clone(),
        display_date(&p.birth_date),
        p.age.clone(),
        p.biological_sex.label().to_string(),
        p.insurance.map(|v| v.label()).unwrap_or_default().to_string(),
        p.admission_origin.map(|v| v.label()).unwrap_or_default().to_string(),
        p.admission_origin_details.clone(),
        p.origin.map(|v| v.label()).unwrap_or_default().to_string(),
        yes_no(p.is_rapanui),
        p.pathology.clone(),
        p.diagnosis_comments.clone(),
        p.specialty.label().to_string(),
        p.status.label().to_string(),
        display_date(&p.admission_date),
        yes_no(p.has_wristband),
        yes_no(p.is_bedridden),
        p.devices.join("|"),
        installed(cup),
        removed(cup),
        installed(cvc),
        removed(cvc),
        installed(vmi),
        removed(vmi),
        yes_no(p.surgical_complication),
        yes_no(p.is_upc),
        p.handoff_note.clone(),
        nurses.to_string(),
    ];
    fields.iter().map(|f| escape(f)).collect::<Vec<_>>().join(",")
}

fn installed(info: Option<&DeviceInfo>) -> String {
    display_date(info.and_then(|i| i.installation_date.as_deref()).unwrap_or_default())
}

fn removed(info: Option<&DeviceInfo>) -> String {
    display_date(info.and_then(|i| i.removal_date.as_deref()).unwrap_or_default())
}

/// Non-empty nurse slots joined with `" & "`, or the legacy single-nurse field.
fn nurse_field(record: &DailyRecord) -> String {
    let named: Vec<&str> = record
        .nurses
        .iter()
        .map(String::as_str)
        .filter(|n| !n.is_empty())
        .collect();
    if named.is_empty() {
        record.nurse_name.clone().unwrap_or_default()
    } else {
        named.join(" & ")
    }
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "SI" } else { "NO" };
    label.to_string()
}

/// `YYYY-MM-DD` as `DD-MM-YYYY`; `-` when empty, other shapes unchanged.
pub fn display_date(iso: &str) -> String {
    if iso.is_empty() {
        return "-".into();
    }
    let parts: Vec<&str> = iso.split('-').collect();
    match parts.as_slice() {
        [y, m, d] => format!("{d}-{m}-{y}"),
        _ => iso.to_string(),
    }
}

/// Quote a field only when it contains a separator, quote or newline.
fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Quote any non-empty field.
fn quoted(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("\"{}\"", value.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{BedMode, DeviceDetails, Insurance};
    use crate::record::{DischargeData, DischargeStatus, TransferData};
    use chrono::{NaiveDate, Utc};

    fn record(catalog: &BedCatalog) -> DailyRecord {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        DailyRecord::blank(catalog, date, Utc::now())
    }

    #[test]
    fn test_csv_rows_for_beds_and_cribs() {
        let catalog = BedCatalog::standard();
        let mut record = record(&catalog);
        record.nurses = vec!["Ana".into(), "Luis".into()];
        if let Some(slot) = record.beds.get_mut("R1") {
            slot.main.patient_name = "Pérez, Juan".into();
            slot.main.admission_date = "2025-03-01".into();
            slot.main.insurance = Some(Insurance::Fonasa);
            slot.main.devices = vec!["CUP".into(), "CVC".into()];
            slot.main.device_details = Some(DeviceDetails {
                cup: Some(DeviceInfo {
                    installation_date: Some("2025-03-02".into()),
                    removal_date: None,
                }),
                ..Default::default()
            });
            slot.main.location = "Sala 1".into();
            let mut crib = Occupant::vacant("R1", BedMode::Crib);
            crib.patient_name = "RN Pérez".into();
            slot.clinical_crib = Some(crib);
        }
        if let Some(slot) = record.beds.get_mut("R2") {
            slot.main.is_blocked = true;
            slot.main.blocked_reason = "Aislamiento".into();
        }

        let csv = export_csv(&catalog, &record);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0].split(',').count(), 37);
        assert_eq!(lines.len(), 4);

        let r1: Vec<&str> = lines[1].splitn(4, ',').collect();
        assert_eq!(r1[0], "R1");
        assert!(lines[1].contains("\"Pérez, Juan\""));
        assert!(lines[1].contains(",01-03-2025,"));
        assert!(lines[1].contains(",CUP|CVC,02-03-2025,-,-,-,-,-,"));
        assert!(lines[1].ends_with(",Ana & Luis"));

        assert!(lines[2].starts_with("R1-C,R1 (Cuna Clínica),Sala 1,Cuna,Cuna,"));
        assert!(lines[3].starts_with("R2,"));
        assert!(lines[3].contains(",SI,Aislamiento,"));
    }

    #[test]
    fn test_csv_event_blocks() {
        let catalog = BedCatalog::standard();
        let mut record = record(&catalog);
        record.discharges.push(DischargeData {
            id: "d1".into(),
            bed_name: "R3".into(),
            bed_id: "R3".into(),
            bed_type: "UTI".into(),
            patient_name: "Ana".into(),
            rut: "1-9".into(),
            diagnosis: "Sepsis".into(),
            status: DischargeStatus::Deceased,
            age: "80a".into(),
            insurance: Some(Insurance::Isapre),
            origin: None,
            is_rapanui: false,
            original_data: None,
            is_nested: false,
        });
        record.transfers.push(TransferData {
            id: "t1".into(),
            bed_name: "H1C1".into(),
            bed_id: "H1C1".into(),
            bed_type: "MEDIA".into(),
            patient_name: "Luis".into(),
            rut: "2-7".into(),
            diagnosis: String::new(),
            evacuation_method: "Avión comercial".into(),
            receiving_center: "Otro".into(),
            receiving_center_other: "Clínica Sur".into(),
            transfer_escort: Some("TENS".into()),
            age: "30a".into(),
            insurance: None,
            origin: None,
            is_rapanui: true,
            original_data: None,
            is_nested: false,
        });

        let csv = export_csv(&catalog, &record);
        assert!(csv.contains("\n\n--- ALTAS ---\nCama,Tipo,Paciente,RUT,Diagnóstico,Estado,Edad,Previsión\n"));
        assert!(csv.contains("R3,UTI,\"Ana\",1-9,\"Sepsis\",Fallecido,80a,Isapre"));
        assert!(csv.contains("\n\n--- TRASLADOS ---\n"));
        assert!(csv.ends_with("H1C1,MEDIA,\"Luis\",2-7,,Avión comercial,\"Clínica Sur\",\"TENS\",30a,"));
    }

    #[test]
    fn test_empty_census_is_header_only() {
        let catalog = BedCatalog::standard();
        let csv = export_csv(&catalog, &record(&catalog));
        assert_eq!(csv, CSV_HEADERS.join(","));
        assert_eq!(csv_file_name(&record(&catalog)), "Censo_HangaRoa_2025-03-09.csv");
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2025-01-31"), "31-01-2025");
        assert_eq!(display_date(""), "-");
        assert_eq!(display_date("ayer"), "ayer");
    }

    #[test]
    fn test_export_json_is_pretty_map() {
        let catalog = BedCatalog::standard();
        let mut records = RecordMap::new();
        let r = record(&catalog);
        records.insert(r.key(), r);
        let json = export_json(&records).expect("export");
        assert!(json.starts_with("{\n  \"2025-03-09\": {"));
        let back: RecordMap = serde_json::from_str(&json).expect("parse back");
        assert_eq!(back, records);
    }
}
