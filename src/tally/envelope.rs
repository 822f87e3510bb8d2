//! TDL request envelopes for Tally's XML export interface.
//!
//! Tally accepts these as an HTTP POST body and answers with an XML
//! `ENVELOPE` of its own. The collection names and FETCH lists mirror what
//! Tally ships out of the box, so no custom TDL needs to be installed.

/// Request the list of companies loaded in the Tally instance.
pub fn company_collection() -> String {
    r#"<ENVELOPE>
    <HEADER>
        <VERSION>1</VERSION>
        <TALLYREQUEST>Export</TALLYREQUEST>
        <TYPE>Collection</TYPE>
        <ID>Company Collection</ID>
    </HEADER>
    <BODY>
        <DESC>
            <STATICVARIABLES>
                <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
            </STATICVARIABLES>
            <TDL>
                <TDLMESSAGE>
                    <COLLECTION NAME="Company Collection" ISMODIFY="No">
                        <TYPE>Company</TYPE>
                        <FETCH>NAME</FETCH>
                    </COLLECTION>
                </TDLMESSAGE>
            </TDL>
        </DESC>
    </BODY>
</ENVELOPE>"#
        .to_string()
}

/// Request every ledger with the full field set the bridge stores or
/// displays: hierarchy, contact details, tax id and balances.
pub fn ledger_details() -> String {
    r#"<ENVELOPE>
    <HEADER>
        <VERSION>1</VERSION>
        <TALLYREQUEST>Export</TALLYREQUEST>
        <TYPE>Collection</TYPE>
        <ID>Ledger Details</ID>
    </HEADER>
    <BODY>
        <DESC>
            <STATICVARIABLES>
                <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
            </STATICVARIABLES>
            <TDL>
                <TDLMESSAGE>
                    <COLLECTION NAME="Ledger Details" ISMODIFY="No">
                        <TYPE>Ledger</TYPE>
                        <FETCH>
                            NAME, PARENT, ADDRESS, STATE, COUNTRY,
                            PINCODE, EMAIL, PHONE, MOBILE, GSTIN,
                            OPENINGBALANCE, CLOSINGBALANCE, ALTEREDON
                        </FETCH>
                    </COLLECTION>
                </TDLMESSAGE>
            </TDL>
        </DESC>
    </BODY>
</ENVELOPE>"#
        .to_string()
}
