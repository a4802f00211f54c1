// =============================================================================
// Instrument Catalog: static basket membership tables (October 2025 series)
// =============================================================================
//
// Each table maps a broker symbol token to its display data and index weight.
// Futures tables reference the 28-Oct-2025 expiry and must be rolled by hand
// each series.
// =============================================================================

use crate::types::InstrumentInfo;

const fn info(
    symbol: &'static str,
    name: &'static str,
    company: &'static str,
    weight: f64,
) -> InstrumentInfo {
    InstrumentInfo {
        symbol,
        name,
        company,
        weight,
    }
}

/// Nifty 50 constituents (cash).
pub static NIFTY_50_STOCKS: &[(&str, InstrumentInfo)] = &[
    ("11483", info("LT-EQ", "LT", "Larsen & Toubro Ltd", 3.84)),
    ("10604", info("BHARTIARTL-EQ", "BHARTIARTL", "Bharti Airtel Ltd", 4.53)),
    ("11630", info("NTPC-EQ", "NTPC", "NTPC Ltd", 1.42)),
    ("1333", info("HDFCBANK-EQ", "HDFCBANK", "HDFC Bank Ltd", 12.91)),
    ("1394", info("HINDUNILVR-EQ", "HINDUNILVR", "Hindustan Unilever Ltd", 1.98)),
    ("14977", info("POWERGRID-EQ", "POWERGRID", "Power Grid Corporation of India Ltd", 1.15)),
    ("2031", info("M&M-EQ", "M&M", "Mahindra & Mahindra Ltd", 2.69)),
    ("17963", info("NESTLEIND-EQ", "NESTLEIND", "Nestle India Ltd", 0.73)),
    ("20374", info("COALINDIA-EQ", "COALINDIA", "Coal India Ltd", 0.76)),
    ("16675", info("BAJAJFINSV-EQ", "BAJAJFINSV", "Bajaj Finserv Ltd", 1.0)),
    ("1964", info("TRENT-EQ", "TRENT", "Trent Ltd", 0.94)),
    ("21808", info("SBILIFE-EQ", "SBILIFE", "SBI Life Insurance Company Ltd", 0.7)),
    ("22377", info("MAXHEALTH-EQ", "MAXHEALTH", "Max Healthcare Institute Ltd", 0.7)),
    ("236", info("ASIANPAINT-EQ", "ASIANPAINT", "Asian Paints Ltd", 0.93)),
    ("2885", info("RELIANCE-EQ", "RELIANCE", "Reliance Industries Ltd", 8.08)),
    ("3499", info("TATASTEEL-EQ", "TATASTEEL", "Tata Steel Ltd", 1.25)),
    ("5900", info("AXISBANK-EQ", "AXISBANK", "Axis Bank Ltd", 2.96)),
    ("694", info("CIPLA-EQ", "CIPLA", "Cipla Ltd", 0.75)),
    ("383", info("BEL-EQ", "BEL", "Bharat Electronics Ltd", 1.29)),
    ("10999", info("MARUTI-EQ", "MARUTI", "Maruti Suzuki India Ltd", 1.82)),
    ("11195", info("INDIGO-EQ", "INDIGO", "InterGlobe Aviation Ltd", 1.08)),
    ("11723", info("JSWSTEEL-EQ", "JSWSTEEL", "JSW Steel Ltd", 0.95)),
    ("11532", info("ULTRACEMCO-EQ", "ULTRACEMCO", "UltraTech Cement Ltd", 1.25)),
    ("1232", info("GRASIM-EQ", "GRASIM", "Grasim Industries Ltd", 0.93)),
    ("13538", info("TECHM-EQ", "TECHM", "Tech Mahindra Ltd", 0.78)),
    ("11536", info("TCS-EQ", "TCS", "Tata Consultancy Services Ltd", 2.6)),
    ("1363", info("HINDALCO-EQ", "HINDALCO", "Hindalco Industries Ltd", 0.99)),
    ("157", info("APOLLOHOSP-EQ", "APOLLOHOSP", "Apollo Hospitals Enterprise Ltd", 0.66)),
    ("1660", info("ITC-EQ", "ITC", "ITC Ltd", 3.41)),
    ("18143", info("JIOFIN-EQ", "JIOFIN", "Jio Financial Services Ltd", 0.87)),
    ("15083", info("ADANIPORTS-EQ", "ADANIPORTS", "Adani Ports and Special Economic Zone Ltd", 0.92)),
    ("1922", info("KOTAKBANK-EQ", "KOTAKBANK", "Kotak Mahindra Bank Ltd", 2.71)),
    ("1594", info("INFY-EQ", "INFY", "Infosys Ltd", 4.56)),
    ("2475", info("ONGC-EQ", "ONGC", "Oil & Natural Gas Corporation Ltd", 0.83)),
    ("25", info("ADANIENT-EQ", "ADANIENT", "Adani Enterprises Ltd", 0.59)),
    ("3351", info("SUNPHARMA-EQ", "SUNPHARMA", "Sun Pharmaceutical Industries Ltd", 1.51)),
    ("7229", info("HCLTECH-EQ", "HCLTECH", "HCL Technologies Ltd", 1.29)),
    ("3787", info("WIPRO-EQ", "WIPRO", "Wipro Ltd", 0.6)),
    ("3045", info("SBIN-EQ", "SBIN", "State Bank of India", 3.16)),
    ("317", info("BAJFINANCE-EQ", "BAJFINANCE", "Bajaj Finance Ltd", 2.3)),
    ("3432", info("TATACONSUM-EQ", "TATACONSUM", "Tata Consumer Products Ltd", 0.65)),
    ("3456", info("TATAMOTORS-EQ", "TATAMOTORS", "Tata Motors Ltd", 1.31)),
    ("5097", info("ETERNAL-EQ", "ETERNAL", "Eternal Materials Co Ltd", 2.0)),
    ("910", info("EICHERMOT-EQ", "EICHERMOT", "Eicher Motors Ltd", 0.84)),
    ("881", info("DRREDDY-EQ", "DRREDDY", "Dr Reddys Laboratories Ltd", 0.67)),
    ("3506", info("TITAN-EQ", "TITAN", "Titan Company Ltd", 1.25)),
    ("4306", info("SHRIRAMFIN-EQ", "SHRIRAMFIN", "Shriram Finance Ltd", 0.79)),
    ("467", info("HDFCLIFE-EQ", "HDFCLIFE", "HDFC Life Insurance Co Ltd", 0.71)),
];

/// Bank Nifty constituents (cash).
pub static BANK_NIFTY_STOCKS: &[(&str, InstrumentInfo)] = &[
    ("10666", info("PNB-EQ", "PNB", "Punjab National Bank", 1.05)),
    ("10794", info("CANBK-EQ", "CANBK", "Canara Bank", 1.13)),
    ("1333", info("HDFCBANK-EQ", "HDFCBANK", "HDFC Bank Ltd", 39.1)),
    ("21238", info("AUBANK-EQ", "AUBANK", "AU Small Finance Bank Ltd", 1.11)),
    ("4963", info("ICICIBANK-EQ", "ICICIBANK", "ICICI Bank Ltd", 25.84)),
    ("4668", info("BANKBARODA-EQ", "BANKBARODA", "Bank of Baroda", 1.29)),
    ("5900", info("AXISBANK-EQ", "AXISBANK", "Axis Bank Ltd", 8.97)),
    ("5258", info("INDUSINDBK-EQ", "INDUSINDBK", "IndusInd Bank Ltd", 1.31)),
    ("1023", info("FEDERALBNK-EQ", "FEDERALBNK", "Federal Bank Ltd", 1.25)),
    ("11184", info("IDFCFIRSTB-EQ", "IDFCFIRSTB", "IDFC First Bank Ltd", 1.21)),
    ("1922", info("KOTAKBANK-EQ", "KOTAKBANK", "Kotak Mahindra Bank Ltd", 8.19)),
    ("3045", info("SBIN-EQ", "SBIN", "State Bank of India", 9.56)),
];

/// Nifty 50 constituent futures.
pub static NIFTY_50_FUTURES: &[(&str, InstrumentInfo)] = &[
    ("52274", info("BEL28OCT25FUT", "BEL", "Bharat Electronics Ltd", 1.29)),
    ("52351", info("GRASIM28OCT25FUT", "GRASIM", "Grasim Industries Ltd", 0.93)),
    ("52442", info("LT28OCT25FUT", "LT", "Larsen & Toubro Ltd", 3.84)),
    ("52454", info("MARUTI28OCT25FUT", "MARUTI", "Maruti Suzuki India Ltd", 1.82)),
    ("52555", info("TRENT28OCT25FUT", "TRENT", "Trent Ltd", 0.94)),
    ("52391", info("INDIGO28OCT25FUT", "INDIGO", "InterGlobe Aviation Ltd", 1.08)),
    ("52240", info("BAJAJFINSV28OCT25FUT", "BAJAJFINSV", "Bajaj Finserv Ltd", 1.0)),
    ("52455", info("MAXHEALTH28OCT25FUT", "MAXHEALTH", "Max Healthcare Institute Ltd", 0.7)),
    ("52509", info("RELIANCE28OCT25FUT", "RELIANCE", "Reliance Industries Ltd", 8.08)),
    ("52532", info("TATAMOTORS28OCT25FUT", "TATAMOTORS", "Tata Motors Ltd", 1.31)),
    ("52558", info("ULTRACEMCO28OCT25FUT", "ULTRACEMCO", "UltraTech Cement Ltd", 1.25)),
    ("52422", info("JSWSTEEL28OCT25FUT", "JSWSTEEL", "JSW Steel Ltd", 0.95)),
    ("52474", info("NTPC28OCT25FUT", "NTPC", "NTPC Ltd", 1.42)),
    ("52504", info("POWERGRID28OCT25FUT", "POWERGRID", "Power Grid Corporation of India Ltd", 1.15)),
    ("52521", info("SUNPHARMA28OCT25FUT", "SUNPHARMA", "Sun Pharmaceutical Industries Ltd", 1.51)),
    ("52539", info("TCS28OCT25FUT", "TCS", "Tata Consultancy Services Ltd", 2.6)),
    ("52370", info("HINDUNILVR28OCT25FUT", "HINDUNILVR", "Hindustan Unilever Ltd", 1.98)),
    ("52568", info("WIPRO28OCT25FUT", "WIPRO", "Wipro Ltd", 0.6)),
    ("52176", info("ADANIPORTS28OCT25FUT", "ADANIPORTS", "Adani Ports and Special Economic Zone Ltd", 0.92)),
    ("52223", info("AXISBANK28OCT25FUT", "AXISBANK", "Axis Bank Ltd", 2.96)),
    ("52446", info("M&M28OCT25FUT", "M&M", "Mahindra & Mahindra Ltd", 2.69)),
    ("52466", info("NESTLEIND28OCT25FUT", "NESTLEIND", "Nestle India Ltd", 0.73)),
    ("52542", info("TECHM28OCT25FUT", "TECHM", "Tech Mahindra Ltd", 0.78)),
    ("52545", info("TITAN28OCT25FUT", "TITAN", "Titan Company Ltd", 1.25)),
    ("52241", info("BAJFINANCE28OCT25FUT", "BAJFINANCE", "Bajaj Finance Ltd", 2.3)),
    ("52307", info("CIPLA28OCT25FUT", "CIPLA", "Cipla Ltd", 0.75)),
    ("52337", info("EICHERMOT28OCT25FUT", "EICHERMOT", "Eicher Motors Ltd", 0.84)),
    ("52365", info("HDFCLIFE28OCT25FUT", "HDFCLIFE", "HDFC Life Insurance Co Ltd", 0.71)),
    ("52368", info("HINDALCO28OCT25FUT", "HINDALCO", "Hindalco Industries Ltd", 0.99)),
    ("52398", info("INFY28OCT25FUT", "INFY", "Infosys Ltd", 4.56)),
    ("52513", info("SBILIFE28OCT25FUT", "SBILIFE", "SBI Life Insurance Company Ltd", 0.7)),
    ("52514", info("SBIN28OCT25FUT", "SBIN", "State Bank of India", 3.16)),
    ("52216", info("ASIANPAINT28OCT25FUT", "ASIANPAINT", "Asian Paints Ltd", 0.93)),
    ("52276", info("BHARTIARTL28OCT25FUT", "BHARTIARTL", "Bharti Airtel Ltd", 4.53)),
    ("52362", info("HCLTECH28OCT25FUT", "HCLTECH", "HCL Technologies Ltd", 1.29)),
    ("52418", info("JIOFIN28OCT25FUT", "JIOFIN", "Jio Financial Services Ltd", 0.87)),
    ("52489", info("ONGC28OCT25FUT", "ONGC", "Oil & Natural Gas Corporation Ltd", 0.83)),
    ("52527", info("TATACONSUM28OCT25FUT", "TATACONSUM", "Tata Consumer Products Ltd", 0.65)),
    ("52534", info("TATASTEEL28OCT25FUT", "TATASTEEL", "Tata Steel Ltd", 1.25)),
    ("52174", info("ADANIENT28OCT25FUT", "ADANIENT", "Adani Enterprises Ltd", 0.59)),
    ("52214", info("APOLLOHOSP28OCT25FUT", "APOLLOHOSP", "Apollo Hospitals Enterprise Ltd", 0.66)),
    ("52308", info("COALINDIA28OCT25FUT", "COALINDIA", "Coal India Ltd", 0.76)),
    ("52336", info("DRREDDY28OCT25FUT", "DRREDDY", "Dr Reddys Laboratories Ltd", 0.67)),
    ("52364", info("HDFCBANK28OCT25FUT", "HDFCBANK", "HDFC Bank Ltd", 12.91)),
    ("52414", info("ITC28OCT25FUT", "ITC", "ITC Ltd", 3.41)),
    ("52430", info("KOTAKBANK28OCT25FUT", "KOTAKBANK", "Kotak Mahindra Bank Ltd", 2.71)),
    ("52516", info("SHRIRAMFIN28OCT25FUT", "SHRIRAMFIN", "Shriram Finance Ltd", 0.79)),
];

/// Bank Nifty constituent futures.
pub static BANK_NIFTY_FUTURES: &[(&str, InstrumentInfo)] = &[
    ("52340", info("FEDERALBNK28OCT25FUT", "FEDERALBNK", "Federal Bank Ltd", 1.25)),
    ("52256", info("BANKBARODA28OCT25FUT", "BANKBARODA", "Bank of Baroda", 1.29)),
    ("52218", info("AUBANK28OCT25FUT", "AUBANK", "AU Small Finance Bank Ltd", 1.11)),
    ("52223", info("AXISBANK28OCT25FUT", "AXISBANK", "Axis Bank Ltd", 8.97)),
    ("52374", info("ICICIBANK28OCT25FUT", "ICICIBANK", "ICICI Bank Ltd", 25.84)),
    ("52380", info("IDFCFIRSTB28OCT25FUT", "IDFCFIRSTB", "IDFC First Bank Ltd", 1.21)),
    ("52394", info("INDUSINDBK28OCT25FUT", "INDUSINDBK", "IndusInd Bank Ltd", 1.31)),
    ("52514", info("SBIN28OCT25FUT", "SBIN", "State Bank of India", 9.56)),
    ("52303", info("CANBK28OCT25FUT", "CANBK", "Canara Bank", 1.13)),
    ("52500", info("PNB28OCT25FUT", "PNB", "Punjab National Bank", 1.05)),
    ("52364", info("HDFCBANK28OCT25FUT", "HDFCBANK", "HDFC Bank Ltd", 39.1)),
    ("52430", info("KOTAKBANK28OCT25FUT", "KOTAKBANK", "Kotak Mahindra Bank Ltd", 8.19)),
];

/// Look up a token in a catalog table.
pub fn lookup<'a>(
    catalog: &'a [(&'static str, InstrumentInfo)],
    token: &str,
) -> Option<&'a InstrumentInfo> {
    catalog.iter().find(|(t, _)| *t == token).map(|(_, info)| info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_well_formed(table: &[(&str, InstrumentInfo)]) {
        let tokens: HashSet<_> = table.iter().map(|(t, _)| *t).collect();
        assert_eq!(tokens.len(), table.len(), "duplicate token");
        assert!(table.iter().all(|(_, i)| i.weight > 0.0));
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(NIFTY_50_STOCKS.len(), 48);
        assert_eq!(BANK_NIFTY_STOCKS.len(), 12);
        assert_eq!(NIFTY_50_FUTURES.len(), 47);
        assert_eq!(BANK_NIFTY_FUTURES.len(), 12);
    }

    #[test]
    fn tables_have_unique_tokens_and_positive_weights() {
        assert_well_formed(NIFTY_50_STOCKS);
        assert_well_formed(BANK_NIFTY_STOCKS);
        assert_well_formed(NIFTY_50_FUTURES);
        assert_well_formed(BANK_NIFTY_FUTURES);
    }

    #[test]
    fn lookup_finds_known_token() {
        let hdfc = lookup(BANK_NIFTY_STOCKS, "1333").unwrap();
        assert_eq!(hdfc.name, "HDFCBANK");
        assert!((hdfc.weight - 39.1).abs() < 1e-9);
        assert!(lookup(BANK_NIFTY_STOCKS, "99999").is_none());
    }
}
