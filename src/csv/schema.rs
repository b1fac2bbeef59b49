//! Column layouts and downloadable templates for each importable type

use std::fmt;
use std::str::FromStr;

/// Record type a CSV file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Structures,
    Plessi,
    Roads,
    Interventions,
}

pub const STRUCTURE_COLUMNS: &[&str] = &[
    "nome",
    "indirizzo",
    "descrizione",
    "codice_univoco",
    "centro_costo",
];

pub const PLESSO_COLUMNS: &[&str] = &[
    "codice_univoco_immobile_riferimento",
    "nome_plesso",
    "descrizione_plesso",
    "codice_univoco_plesso",
    "centro_di_costo",
];

pub const ROAD_COLUMNS: &[&str] = &[
    "codice_sp",
    "nome",
    "lunghezza_km",
    "descrizione",
    "codice_univoco",
];

pub const INTERVENTION_COLUMNS: &[&str] = &[
    "cig",
    "titolo",
    "oggetto",
    "importo",
    "rup",
    "data_inizio",
    "data_fine",
    "codice_univoco_asset_target",
    "tipologia",
];

impl ImportKind {
    pub fn all() -> &'static [ImportKind] {
        &[
            ImportKind::Structures,
            ImportKind::Plessi,
            ImportKind::Roads,
            ImportKind::Interventions,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Structures => "structures",
            ImportKind::Plessi => "plessi",
            ImportKind::Roads => "roads",
            ImportKind::Interventions => "interventions",
        }
    }

    /// Expected header, in column order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Structures => STRUCTURE_COLUMNS,
            ImportKind::Plessi => PLESSO_COLUMNS,
            ImportKind::Roads => ROAD_COLUMNS,
            ImportKind::Interventions => INTERVENTION_COLUMNS,
        }
    }

    pub fn template_filename(&self) -> &'static str {
        match self {
            ImportKind::Structures => "template_immobili.csv",
            ImportKind::Plessi => "template_plessi.csv",
            ImportKind::Roads => "template_strade.csv",
            ImportKind::Interventions => "template_interventi.csv",
        }
    }

    fn example_rows(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Structures => &[
                "Palazzo Regio,Piazza Palazzo 1,Sede storica istituzionale,IMM_000101,AMMIN_CENTRALE",
                "Liceo Scientifico,Via degli Studi 10,Edificio scolastico principale,IMM_000102,ISTR_AREA_A",
            ],
            ImportKind::Plessi => &[
                "IMM_000101,Ala Sud,Uffici presidenza,PLX_000101,CDC_AREA_1",
                "IMM_000102,Palestra,Impianto sportivo coperto,PLX_000102,CDC_AREA_2",
            ],
            ImportKind::Roads => &[
                "SP 1,Strada Provinciale 1,15.5,Collegamento costa-entroterra,STR_000001",
                "SP 12,Via del Mare,8.2,Strada panoramica costiera,STR_000002",
            ],
            ImportKind::Interventions => &[
                "B12345678X,Rifacimento Tetto,Manutenzione straordinaria coperture,150000,Ing. Mario Rossi,2024-05-01,2024-12-31,IMM_000101,Interventi Straordinari",
                "C99887766Y,Segnaletica SP1,Posa cartellonistica Km 0-5,15000,Arch. Luigi Verdi,2024-06-15,2024-07-15,STR_000001,Manutenzioni",
            ],
        }
    }

    /// Header line followed by two example rows
    pub fn template(&self) -> String {
        let mut out = self.columns().join(",");
        for row in self.example_rows() {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structures" | "structure" | "building" | "buildings" | "immobili" => {
                Ok(ImportKind::Structures)
            }
            "plessi" | "plesso" => Ok(ImportKind::Plessi),
            "roads" | "road" | "strade" => Ok(ImportKind::Roads),
            "interventions" | "intervention" | "int" | "interventi" => {
                Ok(ImportKind::Interventions)
            }
            _ => Err(format!(
                "Unsupported import type: '{}'. Supported: structures, plessi, roads, interventions",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rows_match_header_width() {
        for kind in ImportKind::all() {
            let template = kind.template();
            let width = kind.columns().len();
            for line in template.lines() {
                assert_eq!(line.split(',').count(), width, "{} template", kind);
            }
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("strade".parse::<ImportKind>(), Ok(ImportKind::Roads));
        assert_eq!("int".parse::<ImportKind>(), Ok(ImportKind::Interventions));
        assert!("foo".parse::<ImportKind>().is_err());
    }
}
