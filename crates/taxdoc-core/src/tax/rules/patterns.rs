//! Regex patterns for US tax-form extraction.
//!
//! Field pattern lists run from most specific (a box label next to its
//! value) to least specific (a bare amount of the expected shape). Capture
//! group 1 is always the amount.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Form headers and classification cues
    pub static ref W2_HEADER: Regex = Regex::new(
        r"(?i)(W-?2\s+Wage|Form\s+W-?2|W-?2\s+Tax)"
    ).unwrap();

    pub static ref W2_BOX_LABELS: Regex = Regex::new(
        r"(?i)(Wages.*Box\s+1|Federal\s+Tax\s+Withheld.*Box\s+2)"
    ).unwrap();

    pub static ref FORM_1098: Regex = Regex::new(
        r"(?i)(1098.*Mortgage|Mortgage.*1098|Form\s+1098)"
    ).unwrap();

    pub static ref WAGES_TIPS_COMPENSATION: Regex = Regex::new(
        r"(?i)Wages.*Tips.*Compensation"
    ).unwrap();

    pub static ref WAGE_PHRASE: Regex = Regex::new(
        r"(?i)\b(?:wages|compensation)\b"
    ).unwrap();

    pub static ref FEDERAL_WITHHELD_PHRASE: Regex = Regex::new(
        r"(?i)federal\s+(?:income\s+)?tax\s+withheld"
    ).unwrap();

    pub static ref INTEREST_PHRASE: Regex = Regex::new(
        r"(?i)\binterest\s+income\b"
    ).unwrap();

    // Recipient names
    pub static ref RECIPIENT_NAME: Regex = Regex::new(
        r"(?:Employee's name|Employee name|Recipient's name|Recipient name|Borrower's name|Partner's name)[^\n]*?([A-Z][a-z]+ [A-Z][a-z]+)"
    ).unwrap();

    // W-2 box 1
    pub static ref WAGES_LABELED: Regex = Regex::new(
        r"(?i)\bWages[^\d\n]{0,40}(\d[\d,]*\.\d{2})\b"
    ).unwrap();

    pub static ref WAGES_BOX_1: Regex = Regex::new(
        r"(?i)(?:Box\s*1|Box\s*1:|\b1\b)\s*(?:Wages,\s+tips|Wages|Income).+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref WAGES_TIPS_OTHER: Regex = Regex::new(
        r"(?i)Wages,\s+tips,\s+other\s+comp\w*.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref AMOUNT_BEFORE_AMOUNT: Regex = Regex::new(
        r"\b(\d{4,6}\.\d{2})\s+\d{3,4}\.\d{2}\b"
    ).unwrap();

    pub static ref AMOUNT_BEFORE_FEDERAL: Regex = Regex::new(
        r"(?i)\b(\d{4,6}\.\d{2}).*Federal"
    ).unwrap();

    pub static ref BARE_WAGE_AMOUNT: Regex = Regex::new(
        r"\b(\d{4,6}\.\d{2})\b"
    ).unwrap();

    // W-2 box 2 and withholding on other forms
    pub static ref WITHHELD_BOX_2: Regex = Regex::new(
        r"(?i)(?:Box\s*2|Box\s*2:|\b2\b)\s*(?:Fed|Federal).+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref WITHHELD_LABELED: Regex = Regex::new(
        r"(?i)Federal\s+(?:income\s+)?tax\s+withheld[^\d\n]*?(\d[\d,]*\.?\d*)"
    ).unwrap();

    pub static ref AMOUNT_BEFORE_BOX_OR_FED: Regex = Regex::new(
        r"(?i)\b(\d{3,4}\.\d{2})\s*(?:Box|Fed)"
    ).unwrap();

    pub static ref BARE_WITHHELD_AMOUNT: Regex = Regex::new(
        r"\b(\d{3,4}\.\d{2})\b"
    ).unwrap();

    // 1099-INT
    pub static ref INTEREST_INCOME: Regex = Regex::new(
        r"(?i)Interest\s+Income.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref INTEREST_BOX_1: Regex = Regex::new(
        r"(?i)Box\s*1[:.]?\s+Interest\s+income[^$]*?(\d[\d,.]+)"
    ).unwrap();

    pub static ref TOTAL_INTEREST: Regex = Regex::new(
        r"(?i)Total\s+interest\s+income.*?(\d[\d,.]+)"
    ).unwrap();

    // 1099-DIV
    pub static ref ORDINARY_DIVIDENDS: Regex = Regex::new(
        r"(?i)(?:Dividend|Ordinary\s+dividends).+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref DIVIDENDS_BOX_1A: Regex = Regex::new(
        r"(?i)Box\s*1a[:.]?\s+Ordinary\s+dividends[^$]*?(\d[\d,.]+)"
    ).unwrap();

    pub static ref TOTAL_DIVIDENDS: Regex = Regex::new(
        r"(?i)Total\s+dividends.*?(\d[\d,.]+)"
    ).unwrap();

    pub static ref CAPITAL_GAIN_DISTRIBUTIONS: Regex = Regex::new(
        r"(?i)(?:Box\s*2a[:.]?\s+)?Total\s+capital\s+gain\s+distr\w*[^\d\n]*?(\d[\d,]*\.\d{2})"
    ).unwrap();

    // 1099-MISC / 1099-NEC
    pub static ref NONEMPLOYEE_COMPENSATION: Regex = Regex::new(
        r"(?i)Nonemployee\s+Compensation.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref NONEMPLOYEE_BOX_7: Regex = Regex::new(
        r"(?i)Box\s*7[:.]?\s+Nonemployee\s+compensation[^$]*?(\d[\d,.]+)"
    ).unwrap();

    // 1099-R
    pub static ref GROSS_DISTRIBUTION: Regex = Regex::new(
        r"(?i)Gross\s+distribution[^\d\n]*?(\d[\d,]*\.\d{2})"
    ).unwrap();

    pub static ref IRA_DISTRIBUTIONS: Regex = Regex::new(
        r"(?i)(?:IRA\s+distributions|Total\s+distribution).+?(\d[\d,.]+)"
    ).unwrap();

    // 1098
    pub static ref MORTGAGE_BOX_1: Regex = Regex::new(
        r"(?i)(?:Box\s*1|Box\s*1:|\b1\b)\s*Mortgage\s+interest.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref MORTGAGE_RECEIVED: Regex = Regex::new(
        r"(?i)Mortgage\s+interest\s+received.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref AMOUNT_BEFORE_MORTGAGE: Regex = Regex::new(
        r"(?i)\b(\d{1,3}(?:,\d{3})*\.\d{2}).*mortgage"
    ).unwrap();

    // Schedule K-1
    pub static ref PARTNER_SHARE: Regex = Regex::new(
        r"(?i)Partner\s+Distributive\s+Share.+?(\d[\d,.]+)"
    ).unwrap();

    pub static ref K1_FORM_1065: Regex = Regex::new(
        r"(?i)Schedule\s+K-1\s+\(Form\s+1065\).+?(\d[\d,.]+)"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(re: &Regex, text: &str) -> Option<String> {
        re.captures(text).map(|c| c[1].to_string())
    }

    #[test]
    fn test_wage_patterns() {
        assert_eq!(
            first(&WAGES_LABELED, "Wages 54000.00 ... Federal tax withheld 6200.00"),
            Some("54000.00".to_string())
        );
        assert_eq!(
            first(&WAGES_TIPS_OTHER, "1 Wages, tips, other compensation 54,000.00"),
            Some("54,000.00".to_string())
        );
        assert_eq!(
            first(&AMOUNT_BEFORE_AMOUNT, "54000.00 6200.00"),
            Some("54000.00".to_string())
        );
        assert_eq!(
            first(&AMOUNT_BEFORE_FEDERAL, "total 54000.00 then Federal"),
            Some("54000.00".to_string())
        );
    }

    #[test]
    fn test_bare_amounts_respect_word_boundaries() {
        // "4000.00" must not be carved out of "154000.00"
        assert_eq!(first(&BARE_WITHHELD_AMOUNT, "154000.00"), None);
        assert_eq!(first(&BARE_WAGE_AMOUNT, "1234567.00"), None);
        assert_eq!(first(&BARE_WAGE_AMOUNT, "x 54000.00 y"), Some("54000.00".to_string()));
    }

    #[test]
    fn test_withheld_patterns() {
        assert_eq!(
            first(&WITHHELD_LABELED, "Federal tax withheld 6200.00"),
            Some("6200.00".to_string())
        );
        assert_eq!(
            first(&WITHHELD_LABELED, "Federal income tax withheld: $6,200.00"),
            Some("6,200.00".to_string())
        );
        assert_eq!(
            first(&AMOUNT_BEFORE_BOX_OR_FED, "6200.00 Box 2"),
            Some("6200.00".to_string())
        );
    }

    #[test]
    fn test_classification_cues() {
        assert!(W2_HEADER.is_match("Form W-2 Wage and Tax Statement"));
        assert!(W2_HEADER.is_match("w2 tax statement"));
        assert!(FORM_1098.is_match("Mortgage Interest Statement Form 1098"));
        assert!(!FORM_1098.is_match("Form 1099-INT"));
        assert!(FEDERAL_WITHHELD_PHRASE.is_match("Federal Income Tax Withheld"));
        assert!(INTEREST_PHRASE.is_match("Interest Income 150.00"));
    }

    #[test]
    fn test_other_form_patterns() {
        assert_eq!(
            first(&INTEREST_INCOME, "Interest Income 150.00"),
            Some("150.00".to_string())
        );
        assert_eq!(
            first(&ORDINARY_DIVIDENDS, "1a Ordinary dividends 1,250.10"),
            Some("1,250.10".to_string())
        );
        assert_eq!(
            first(&CAPITAL_GAIN_DISTRIBUTIONS, "2a Total capital gain distr. $310.55"),
            Some("310.55".to_string())
        );
        assert_eq!(
            first(&GROSS_DISTRIBUTION, "1 Gross distribution 12,000.00"),
            Some("12,000.00".to_string())
        );
        assert_eq!(
            first(&MORTGAGE_RECEIVED, "Mortgage interest received from borrower 8,400.00"),
            Some("8,400.00".to_string())
        );
    }

    #[test]
    fn test_recipient_name() {
        assert_eq!(
            first(&RECIPIENT_NAME, "Employee's name, address and ZIP Jane Doe"),
            Some("Jane Doe".to_string())
        );
        assert_eq!(first(&RECIPIENT_NAME, "Payer's name Acme Bank"), None);
        assert_eq!(
            first(
                &RECIPIENT_NAME,
                "Payer's name Acme Bank\nRecipient's name John Smith"
            ),
            Some("John Smith".to_string())
        );
    }
}
