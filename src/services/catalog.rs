//! Instrument Catalog
//!
//! Static definitions for every tradable instrument. Loaded once at startup
//! and shared read-only across all sessions; per-session price state is
//! seeded from the base prices here.

use crate::types::{Instrument, InstrumentKind};
use std::collections::HashMap;

use InstrumentKind::{Bond, Dividend, Etf, Growth};

/// (symbol, display name, base price, kind, base volatility)
const DEFINITIONS: &[(&str, &str, f64, InstrumentKind, f64)] = &[
    // Growth
    ("NVTX", "Novatex Systems", 142.50, Growth, 0.032),
    ("QBIT", "Qubitra Computing", 88.20, Growth, 0.045),
    ("AERO", "Aerovance Dynamics", 211.75, Growth, 0.028),
    ("SYNC", "Syncline Software", 64.10, Growth, 0.030),
    ("HELX", "Helixon Biogenetics", 37.85, Growth, 0.048),
    ("VLTA", "Voltaic Motors", 178.40, Growth, 0.042),
    ("CRSP", "Crispfield Therapeutics", 52.30, Growth, 0.046),
    ("ORBT", "Orbitall Aerospace", 96.65, Growth, 0.038),
    ("NANM", "Nanometric Labs", 28.90, Growth, 0.050),
    ("DRFT", "Driftwave Media", 45.20, Growth, 0.035),
    ("PLSM", "Plasmatic Energy", 71.10, Growth, 0.040),
    ("KRNL", "Kernelworks", 133.80, Growth, 0.029),
    ("FLUX", "Fluxion Semiconductors", 157.25, Growth, 0.036),
    ("BYTE", "Bytebridge Networks", 82.45, Growth, 0.031),
    ("GNOM", "Genomiq Sciences", 41.60, Growth, 0.047),
    ("LUMN", "Luminar Optics", 59.95, Growth, 0.034),
    ("RYZN", "Ryzen Robotics", 112.30, Growth, 0.039),
    ("CLDV", "Cloudvale", 194.70, Growth, 0.027),
    ("SPRK", "Sparkmetrics", 36.40, Growth, 0.044),
    ("TETH", "Tetherion Security", 67.85, Growth, 0.033),
    ("MBLR", "Mobilar Technologies", 24.15, Growth, 0.049),
    ("AXIM", "Axiom Data", 148.90, Growth, 0.026),
    ("PYRA", "Pyralux Displays", 53.70, Growth, 0.037),
    ("VRTC", "Vertacore", 91.20, Growth, 0.030),
    ("ZEPH", "Zephyrline Logistics", 43.55, Growth, 0.041),
    ("INGT", "Ingenit AI", 226.80, Growth, 0.043),
    ("SOLS", "Solstice Solar", 31.25, Growth, 0.045),
    ("THRM", "Thermionix", 76.50, Growth, 0.032),
    ("NEBU", "Nebulon Storage", 118.35, Growth, 0.029),
    ("ARCV", "Arcvector Gaming", 48.60, Growth, 0.046),
    ("QNTA", "Quantalytics", 165.40, Growth, 0.038),
    ("EMBR", "Emberlight Studios", 27.95, Growth, 0.044),
    ("CYTO", "Cytovance Pharma", 58.20, Growth, 0.047),
    ("RDAR", "Radarian Defense", 102.75, Growth, 0.025),
    ("WAVD", "Wavedance Audio", 34.80, Growth, 0.040),
    ("OPTM", "Optimaxe", 87.10, Growth, 0.031),
    ("STRT", "Stratonic Drones", 62.45, Growth, 0.042),
    ("MESH", "Meshgrid Telecom", 73.90, Growth, 0.028),
    ("FERV", "Fervence Biotech", 39.15, Growth, 0.050),
    ("HALC", "Halcyon Motors", 126.60, Growth, 0.036),
    ("PIXL", "Pixelforge", 55.35, Growth, 0.039),
    ("CRBN", "Carbonara Materials", 44.70, Growth, 0.043),
    ("NEXL", "Nexalith Mining Tech", 68.25, Growth, 0.041),
    ("VIVD", "Vividware", 93.85, Growth, 0.033),
    ("TORQ", "Torqline Industrial", 81.40, Growth, 0.027),
    ("GLCR", "Glacier Compute", 139.95, Growth, 0.034),
    ("RAPT", "Raptor Analytics", 107.20, Growth, 0.037),
    ("SNTH", "Synthetiq Foods", 29.60, Growth, 0.045),
    ("AURM", "Auram Fintech", 115.75, Growth, 0.035),
    ("BLNK", "Blinkcast", 22.40, Growth, 0.048),
    ("CVRT", "Convertix", 77.65, Growth, 0.030),
    ("DYNO", "Dynomight Power", 98.30, Growth, 0.038),
    ("ECHO", "Echoplex VR", 50.85, Growth, 0.046),
    ("FRGE", "Forgepoint Metals", 66.90, Growth, 0.032),
    ("HYDR", "Hydrion Fuel", 35.45, Growth, 0.049),
    // Dividend
    ("CONG", "Conglomera Holdings", 154.20, Dividend, 0.012),
    ("UTLP", "Utiliplex Power & Light", 88.75, Dividend, 0.008),
    ("BANQ", "Banqora Financial", 112.40, Dividend, 0.014),
    ("INSR", "Insurature Group", 97.60, Dividend, 0.011),
    ("RAIL", "Railmont Freight", 183.25, Dividend, 0.013),
    ("FOOD", "Foodstead Brands", 74.90, Dividend, 0.009),
    ("BEVG", "Beverona", 61.35, Dividend, 0.010),
    ("PHRM", "Pharmacore", 128.50, Dividend, 0.015),
    ("TELE", "Telestar Communications", 43.20, Dividend, 0.012),
    ("PETR", "Petrovale Energy", 105.80, Dividend, 0.018),
    ("MINL", "Mineralis Resources", 89.45, Dividend, 0.017),
    ("HOMS", "Homestead REIT", 56.70, Dividend, 0.013),
    ("MALL", "Mallbrook Properties", 38.25, Dividend, 0.016),
    ("WTRW", "Waterway Utilities", 67.15, Dividend, 0.007),
    ("GASL", "Gaslight Distribution", 52.90, Dividend, 0.009),
    ("CHEM", "Chemverse Industrial", 121.60, Dividend, 0.014),
    ("PAPR", "Paperton Packaging", 46.35, Dividend, 0.010),
    ("TOOL", "Toolcraft Manufacturing", 94.20, Dividend, 0.012),
    ("SHIP", "Shipwell Maritime", 71.85, Dividend, 0.016),
    ("GROC", "Grocerhub Markets", 58.40, Dividend, 0.008),
    ("APRL", "Apparelton", 33.75, Dividend, 0.015),
    ("FURN", "Furnwood Living", 41.50, Dividend, 0.013),
    ("MEDS", "Medsupply Direct", 85.95, Dividend, 0.011),
    ("AGRI", "Agrivest Farms", 63.30, Dividend, 0.014),
    ("TRST", "Trustline Bancorp", 78.65, Dividend, 0.012),
    ("LOGI", "Logibound Warehousing", 99.10, Dividend, 0.010),
    ("PRNT", "Printora Labels", 27.80, Dividend, 0.011),
    ("CEMT", "Cemtech Building", 109.45, Dividend, 0.013),
    ("GLAS", "Glasmere Containers", 49.20, Dividend, 0.009),
    ("BRGE", "Bridgestead Infrastructure", 132.70, Dividend, 0.010),
    ("LNDR", "Landmark Lending", 86.15, Dividend, 0.012),
    // ETFs
    ("TMKT", "Total Market Index Fund", 284.60, Etf, 0.009),
    ("GRWX", "Growth Leaders ETF", 198.35, Etf, 0.016),
    ("DIVX", "Dividend Aristocrat ETF", 126.80, Etf, 0.007),
    ("TECX", "Technology Sector ETF", 312.45, Etf, 0.018),
    ("HLTX", "Healthcare Sector ETF", 154.90, Etf, 0.011),
    ("FINX", "Financials Sector ETF", 88.20, Etf, 0.012),
    ("ENRX", "Energy Sector ETF", 76.55, Etf, 0.017),
    ("UTLX", "Utilities Sector ETF", 64.30, Etf, 0.006),
    ("CNSX", "Consumer Staples ETF", 92.75, Etf, 0.005),
    ("DSCX", "Consumer Discretionary ETF", 143.10, Etf, 0.014),
    ("INDX", "Industrials Sector ETF", 117.85, Etf, 0.010),
    ("MATX", "Materials Sector ETF", 81.40, Etf, 0.013),
    ("RELX", "Real Estate ETF", 58.95, Etf, 0.011),
    ("SMCX", "Small Cap Index ETF", 104.25, Etf, 0.015),
    ("MDCX", "Mid Cap Index ETF", 138.60, Etf, 0.012),
    ("INTX", "International Developed ETF", 72.30, Etf, 0.010),
    ("EMGX", "Emerging Markets ETF", 46.85, Etf, 0.019),
    ("VALX", "Value Factor ETF", 96.50, Etf, 0.008),
    ("MOMX", "Momentum Factor ETF", 112.95, Etf, 0.016),
    ("LOVX", "Low Volatility ETF", 84.70, Etf, 0.004),
    ("EQWX", "Equal Weight Index ETF", 129.35, Etf, 0.009),
    ("GLDX", "Gold Trust ETF", 168.20, Etf, 0.012),
    ("SLVX", "Silver Trust ETF", 24.60, Etf, 0.020),
    ("CMDX", "Commodity Basket ETF", 37.90, Etf, 0.015),
    ("INFX", "Infrastructure ETF", 53.45, Etf, 0.008),
    ("CLNX", "Clean Energy ETF", 68.75, Etf, 0.022),
    ("ROBX", "Robotics & Automation ETF", 89.60, Etf, 0.018),
    ("BIOX", "Biotech Breakout ETF", 61.25, Etf, 0.024),
    // Bonds
    ("TB01", "Treasury 1-Year Note", 99.45, Bond, 0.002),
    ("TB02", "Treasury 2-Year Note", 98.80, Bond, 0.002),
    ("TB05", "Treasury 5-Year Note", 97.35, Bond, 0.003),
    ("TB10", "Treasury 10-Year Bond", 95.60, Bond, 0.004),
    ("TB30", "Treasury 30-Year Bond", 92.15, Bond, 0.005),
    ("MUNI", "Municipal Bond Fund", 54.20, Bond, 0.003),
    ("CORP", "Corporate Bond Fund", 83.70, Bond, 0.004),
    ("HYLD", "High Yield Bond Fund", 46.90, Bond, 0.008),
    ("TIPS", "Inflation Protected Fund", 61.45, Bond, 0.003),
    ("AGGB", "Aggregate Bond Index", 101.25, Bond, 0.003),
    ("STBF", "Short Term Bond Fund", 49.85, Bond, 0.002),
    ("LTBF", "Long Term Bond Fund", 88.30, Bond, 0.006),
    ("GOVB", "Government Bond Fund", 75.55, Bond, 0.002),
    ("INVB", "Investment Grade Fund", 93.40, Bond, 0.004),
    ("EMBD", "Emerging Market Bonds", 41.75, Bond, 0.009),
    ("FLTB", "Floating Rate Fund", 50.60, Bond, 0.002),
    ("CNVB", "Convertible Bond Fund", 67.20, Bond, 0.007),
    ("MBSF", "Mortgage Backed Fund", 58.85, Bond, 0.004),
    ("INTB", "International Bond Fund", 52.35, Bond, 0.005),
    ("ZERO", "Zero Coupon Fund", 36.50, Bond, 0.006),
    ("SOVB", "Sovereign Debt Fund", 44.95, Bond, 0.005),
];

/// Read-only instrument catalog.
pub struct Catalog {
    instruments: Vec<Instrument>,
    by_symbol: HashMap<String, usize>,
}

impl Catalog {
    /// Build the built-in catalog.
    pub fn builtin() -> Self {
        let instruments: Vec<Instrument> = DEFINITIONS
            .iter()
            .map(|(symbol, name, price, kind, vol)| {
                Instrument::new(symbol, name, *price, *kind, *vol)
            })
            .collect();
        let by_symbol = instruments
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.symbol.clone(), i))
            .collect();
        Self {
            instruments,
            by_symbol,
        }
    }

    /// Look up an instrument by symbol (case-insensitive).
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .map(|&i| &self.instruments[i])
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(&symbol.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size() {
        let catalog = Catalog::builtin();
        assert!(catalog.len() >= 130, "expected a full catalog, got {}", catalog.len());
    }

    #[test]
    fn test_symbols_are_unique_and_well_formed() {
        let catalog = Catalog::builtin();
        let unique: std::collections::HashSet<&str> =
            catalog.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(unique.len(), catalog.len(), "duplicate symbol in catalog");
        for inst in catalog.iter() {
            assert!(!inst.symbol.is_empty() && inst.symbol.len() <= 5);
            assert!(inst
                .symbol
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(inst.base_price > 0.0);
            assert!(inst.base_volatility > 0.0);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = Catalog::builtin();
        assert!(catalog.get("nvtx").is_some());
        assert!(catalog.get("NVTX").is_some());
        assert!(catalog.get("NOPE9").is_none());
    }
}
