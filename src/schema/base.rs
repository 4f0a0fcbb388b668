pub const CREATE_SCHEMA_SQL: &str = r#"
BEGIN TRANSACTION;

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '2');

-- Case-id sequence. Bumped inside an immediate transaction when a case is
-- created; never reset.
INSERT OR IGNORE INTO meta (key, value) VALUES ('case_seq', '0');

-- Application users. One flat role string per user; deactivation instead of
-- deletion so usernames stay attributable in audit history.
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,        -- 'salt$hexdigest' (salted SHA-256)
    full_name TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL,                 -- Initiator/Investigator/Reviewer/Approver/Legal Reviewer/Actioner/Admin
    active BOOLEAN NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    last_login_at INTEGER DEFAULT NULL
);

-- ========================================
-- Cases
-- ========================================
-- The workflow's single shared record. status is deliberately free text with
-- no CHECK constraint: pages write their own vocabulary and nothing validates
-- transitions.
CREATE TABLE IF NOT EXISTS cases (
    case_id TEXT PRIMARY KEY,           -- generated, 'CASE-YYYYMM-NNNNN'
    category TEXT NOT NULL,             -- Lending / Non-Lending / Internal / Digital Payment
    case_type TEXT NOT NULL,            -- fraud typology, free text
    status TEXT NOT NULL,

    -- Customer demographics
    customer_name TEXT NOT NULL,
    customer_id TEXT DEFAULT NULL,
    pan TEXT DEFAULT NULL,
    mobile TEXT DEFAULT NULL,
    email TEXT DEFAULT NULL,
    address TEXT DEFAULT NULL,
    city TEXT DEFAULT NULL,
    state TEXT DEFAULT NULL,
    pincode TEXT DEFAULT NULL,

    -- Loan / financial details
    branch TEXT DEFAULT NULL,
    region TEXT DEFAULT NULL,
    product TEXT DEFAULT NULL,
    loan_account_number TEXT DEFAULT NULL,
    loan_amount REAL DEFAULT NULL,
    disbursement_date TEXT DEFAULT NULL, -- 'YYYY-MM-DD'

    case_date TEXT NOT NULL,            -- date fraud was detected, 'YYYY-MM-DD'
    description TEXT NOT NULL,

    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,        -- Unix seconds, UTC
    updated_by TEXT DEFAULT NULL,
    updated_at INTEGER DEFAULT NULL
);

CREATE INDEX IF NOT EXISTS idx_cases_status ON cases (status);
CREATE INDEX IF NOT EXISTS idx_cases_created_by ON cases (created_by);
CREATE INDEX IF NOT EXISTS idx_cases_created_at ON cases (created_at DESC);

-- Case comments, append-only
CREATE TABLE IF NOT EXISTS case_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    comment_text TEXT NOT NULL,
    commented_by TEXT NOT NULL,
    commented_at INTEGER NOT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_comments_case ON case_comments (case_id);

-- Audit trail, append-only. No foreign key on case_id: admin actions land
-- here too, under the synthetic case id '-'.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    action TEXT NOT NULL,               -- e.g. 'Status Changed', 'Case Created', 'User Created'
    old_status TEXT DEFAULT NULL,
    new_status TEXT DEFAULT NULL,
    performed_by TEXT NOT NULL,
    performed_at INTEGER NOT NULL,
    details TEXT DEFAULT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_case ON audit_log (case_id);

-- ========================================
-- Workflow satellite tables
-- ========================================

-- Allocation history. Exactly one active row per case; reallocation
-- deactivates the previous row and inserts a new one.
CREATE TABLE IF NOT EXISTS case_allocations (
    allocation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    allocated_to TEXT NOT NULL,         -- investigator username
    allocated_by TEXT NOT NULL,
    allocated_at INTEGER NOT NULL,
    remarks TEXT DEFAULT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_allocations_case ON case_allocations (case_id);
CREATE INDEX IF NOT EXISTS idx_allocations_active ON case_allocations (allocated_to) WHERE is_active = 1;

-- One row per investigation round; a send-back from review starts a new round.
CREATE TABLE IF NOT EXISTS investigation_details (
    investigation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    investigator TEXT NOT NULL,
    findings TEXT DEFAULT NULL,
    modus_operandi TEXT DEFAULT NULL,
    amount_involved REAL DEFAULT NULL,
    fraud_confirmed TEXT DEFAULT NULL,  -- Yes / No / Inconclusive
    field_visit_done TEXT DEFAULT NULL, -- Yes / No
    visit_notes TEXT DEFAULT NULL,
    started_at INTEGER NOT NULL,
    submitted_at INTEGER DEFAULT NULL,  -- NULL while the round is in progress
    updated_at INTEGER DEFAULT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_investigations_case ON investigation_details (case_id);

-- External agency information requests raised during investigation.
CREATE TABLE IF NOT EXISTS agency_responses (
    response_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    agency_name TEXT NOT NULL,
    request_detail TEXT NOT NULL,
    response_detail TEXT DEFAULT NULL,  -- NULL until the response is recorded
    requested_by TEXT NOT NULL,
    requested_at INTEGER NOT NULL,
    responded_at INTEGER DEFAULT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_agency_case ON agency_responses (case_id);

-- Post-decision action items assigned to internal stakeholders.
CREATE TABLE IF NOT EXISTS stakeholder_actions (
    action_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    stakeholder TEXT NOT NULL,          -- Branch / HR / Credit / Collections / IT / ...
    action_detail TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open' CHECK(status IN ('Open', 'Completed')),
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    completed_at INTEGER DEFAULT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_actions_case ON stakeholder_actions (case_id);

-- Reports filed with the regulator (FMR returns, police complaints, ...).
CREATE TABLE IF NOT EXISTS regulatory_reports (
    report_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    report_type TEXT NOT NULL,          -- FMR-1 / FMR-2 / FMR-3 / CRILC / Police Complaint
    reference_number TEXT DEFAULT NULL,
    report_date TEXT NOT NULL,          -- 'YYYY-MM-DD'
    filed_by TEXT NOT NULL,
    filed_at INTEGER NOT NULL,
    remarks TEXT DEFAULT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_regulatory_case ON regulatory_reports (case_id);

-- Approval decisions. A "round" is one pass through the approval stage;
-- dual approval counts distinct approvers within the current round.
CREATE TABLE IF NOT EXISTS case_approvals (
    approval_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    approval_round INTEGER NOT NULL,
    decision TEXT NOT NULL CHECK(decision IN ('Approved', 'Rejected', 'Sent Back')),
    decided_by TEXT NOT NULL,
    decided_at INTEGER NOT NULL,
    remarks TEXT DEFAULT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_approvals_case_round ON case_approvals (case_id, approval_round);

-- Uploaded document metadata; bytes live under <data_dir>/uploads/ keyed by
-- stored_name.
CREATE TABLE IF NOT EXISTS case_documents (
    document_id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    file_name TEXT NOT NULL,            -- original client file name
    stored_name TEXT NOT NULL UNIQUE,   -- on-disk name, uuid + original extension
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    uploaded_by TEXT NOT NULL,
    uploaded_at INTEGER NOT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(case_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_case ON case_documents (case_id);

COMMIT;
"#;
