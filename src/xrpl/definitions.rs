// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XRPL field and transaction type definitions.
//!
//! Subset of the rippled `definitions.json` covering the transactions this
//! wallet builds: payments, DEX offers, trustlines, escrows, tickets and
//! account settings.

/// Serialized type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    UInt16 = 1,
    UInt32 = 2,
    Hash128 = 4,
    Hash256 = 5,
    Amount = 6,
    Blob = 7,
    AccountId = 8,
    StObject = 14,
    StArray = 15,
    UInt8 = 16,
}

impl FieldType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One serializable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Field code within its type ("nth" in rippled).
    pub nth: u8,
}

impl FieldDef {
    /// Canonical ordering key: type code first, then field code.
    pub fn sort_key(&self) -> (u8, u8) {
        (self.field_type.code(), self.nth)
    }

    /// Field ID bytes (1 to 3 bytes depending on the codes).
    pub fn header(&self) -> Vec<u8> {
        let type_code = self.field_type.code();
        let nth = self.nth;
        match (type_code < 16, nth < 16) {
            (true, true) => vec![(type_code << 4) | nth],
            (true, false) => vec![type_code << 4, nth],
            (false, true) => vec![nth, type_code],
            (false, false) => vec![0, type_code, nth],
        }
    }
}

const fn field(name: &'static str, field_type: FieldType, nth: u8) -> FieldDef {
    FieldDef {
        name,
        field_type,
        nth,
    }
}

pub const OBJECT_END_MARKER: u8 = 0xE1;
pub const ARRAY_END_MARKER: u8 = 0xF1;

pub const FIELDS: &[FieldDef] = &[
    // UInt8
    field("TickSize", FieldType::UInt8, 16),
    // UInt16
    field("TransactionType", FieldType::UInt16, 2),
    field("SignerWeight", FieldType::UInt16, 3),
    // UInt32
    field("NetworkID", FieldType::UInt32, 1),
    field("Flags", FieldType::UInt32, 2),
    field("SourceTag", FieldType::UInt32, 3),
    field("Sequence", FieldType::UInt32, 4),
    field("Expiration", FieldType::UInt32, 10),
    field("TransferRate", FieldType::UInt32, 11),
    field("WalletSize", FieldType::UInt32, 12),
    field("DestinationTag", FieldType::UInt32, 14),
    field("QualityIn", FieldType::UInt32, 20),
    field("QualityOut", FieldType::UInt32, 21),
    field("OfferSequence", FieldType::UInt32, 25),
    field("LastLedgerSequence", FieldType::UInt32, 27),
    field("SetFlag", FieldType::UInt32, 33),
    field("ClearFlag", FieldType::UInt32, 34),
    field("SignerQuorum", FieldType::UInt32, 35),
    field("CancelAfter", FieldType::UInt32, 36),
    field("FinishAfter", FieldType::UInt32, 37),
    field("TicketCount", FieldType::UInt32, 40),
    field("TicketSequence", FieldType::UInt32, 41),
    // Hash128
    field("EmailHash", FieldType::Hash128, 1),
    // Hash256
    field("WalletLocator", FieldType::Hash256, 7),
    field("AccountTxnID", FieldType::Hash256, 9),
    field("InvoiceID", FieldType::Hash256, 17),
    // Amount
    field("Amount", FieldType::Amount, 1),
    field("LimitAmount", FieldType::Amount, 3),
    field("TakerPays", FieldType::Amount, 4),
    field("TakerGets", FieldType::Amount, 5),
    field("Fee", FieldType::Amount, 8),
    field("SendMax", FieldType::Amount, 9),
    field("DeliverMin", FieldType::Amount, 10),
    // Blob
    field("MessageKey", FieldType::Blob, 2),
    field("SigningPubKey", FieldType::Blob, 3),
    field("TxnSignature", FieldType::Blob, 4),
    field("Domain", FieldType::Blob, 7),
    field("MemoType", FieldType::Blob, 12),
    field("MemoData", FieldType::Blob, 13),
    field("MemoFormat", FieldType::Blob, 14),
    field("Fulfillment", FieldType::Blob, 16),
    field("Condition", FieldType::Blob, 17),
    // AccountID
    field("Account", FieldType::AccountId, 1),
    field("Owner", FieldType::AccountId, 2),
    field("Destination", FieldType::AccountId, 3),
    field("RegularKey", FieldType::AccountId, 8),
    // STObject
    field("Memo", FieldType::StObject, 10),
    field("SignerEntry", FieldType::StObject, 11),
    // STArray
    field("SignerEntries", FieldType::StArray, 4),
    field("Memos", FieldType::StArray, 9),
];

pub fn field_by_name(name: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|f| f.name == name)
}

pub fn field_by_code(type_code: u8, nth: u8) -> Option<&'static FieldDef> {
    FIELDS
        .iter()
        .find(|f| f.field_type.code() == type_code && f.nth == nth)
}

/// Transaction type names and their `TransactionType` codes.
pub const TRANSACTION_TYPES: &[(&str, u16)] = &[
    ("Payment", 0),
    ("EscrowCreate", 1),
    ("EscrowFinish", 2),
    ("AccountSet", 3),
    ("EscrowCancel", 4),
    ("SetRegularKey", 5),
    ("OfferCreate", 7),
    ("OfferCancel", 8),
    ("TicketCreate", 10),
    ("SignerListSet", 12),
    ("TrustSet", 20),
    ("AccountDelete", 21),
];

pub fn transaction_type_code(name: &str) -> Option<u16> {
    TRANSACTION_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

pub fn transaction_type_name(code: u16) -> Option<&'static str> {
    TRANSACTION_TYPES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}
