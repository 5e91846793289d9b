use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{Encode, FromRow, PgPool, Postgres, QueryBuilder, Type};
use tracing::warn;

use scolarite_models::complaints::{Complaint, ComplaintFilterParams, NewComplaint};
use scolarite_models::details::DetailSet;
use scolarite_models::ids::{ComplaintId, RequestId, StudentId};
use scolarite_models::requests::{DocumentRequest, NewRequest, RequestFilterParams};
use scolarite_models::students::{NewStudent, Student};
use scolarite_models::transcripts::Transcript;

use super::{RequestStore, StoreError, StoreFuture};

const STUDENT_COLUMNS: &str = "id, email, first_name, last_name, cin, cne, level, program, \
     birth_date, birth_place, transcript, created_at";

const REQUEST_COLUMNS: &str = "id, reference, student_id, document_type, status, \
     specific_details, template_data, generated_document_path, document_path, \
     document_uploaded, refusal_reason, created_at, updated_at";

const COMPLAINT_COLUMNS: &str = "id, reference, request_id, status, reason, description, \
     response, regenerated, created_at, updated_at";

#[derive(FromRow)]
struct StudentRow {
    id: StudentId,
    email: String,
    first_name: String,
    last_name: String,
    cin: String,
    cne: Option<String>,
    level: Option<String>,
    program: Option<String>,
    birth_date: Option<NaiveDate>,
    birth_place: Option<String>,
    transcript: Option<Json<serde_json::Value>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        // Registrar exports vary; an unreadable transcript is treated as absent.
        let transcript = row.transcript.and_then(|Json(value)| {
            serde_json::from_value::<Transcript>(value)
                .inspect_err(|e| {
                    warn!(student_id = %row.id, error = %e, "Ignoring unreadable transcript")
                })
                .ok()
        });

        Student {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            cin: row.cin,
            cne: row.cne,
            level: row.level,
            program: row.program,
            birth_date: row.birth_date,
            birth_place: row.birth_place,
            transcript,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: RequestId,
    reference: String,
    student_id: StudentId,
    document_type: String,
    status: String,
    specific_details: Json<DetailSet>,
    template_data: Option<Json<DetailSet>>,
    generated_document_path: Option<String>,
    document_path: Option<String>,
    document_uploaded: bool,
    refusal_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(entity: &'static str) -> impl Fn(String) -> StoreError {
    move |message| StoreError::Corrupt { entity, message }
}

impl TryFrom<RequestRow> for DocumentRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(DocumentRequest {
            id: row.id,
            reference: row.reference,
            student_id: row.student_id,
            document_type: row.document_type.parse().map_err(corrupt("request"))?,
            status: row.status.parse().map_err(corrupt("request"))?,
            specific_details: row.specific_details.0,
            template_data: row.template_data.map(|Json(set)| set),
            generated_document_path: row.generated_document_path,
            document_path: row.document_path,
            document_uploaded: row.document_uploaded,
            refusal_reason: row.refusal_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ComplaintRow {
    id: ComplaintId,
    reference: String,
    request_id: RequestId,
    status: String,
    reason: String,
    description: String,
    response: Option<String>,
    regenerated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = StoreError;

    fn try_from(row: ComplaintRow) -> Result<Self, Self::Error> {
        Ok(Complaint {
            id: row.id,
            reference: row.reference,
            request_id: row.request_id,
            status: row.status.parse().map_err(corrupt("complaint"))?,
            reason: row.reason,
            description: row.description,
            response: row.response,
            regenerated: row.regenerated,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// PostgreSQL-backed store.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn request_where<T>(
        &self,
        column: &'static str,
        value: T,
    ) -> Result<Option<DocumentRequest>, StoreError>
    where
        T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {} FROM requests WHERE {} = $1", REQUEST_COLUMNS, column);
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(DocumentRequest::try_from)
            .transpose()
    }

    async fn complaint_where<T>(
        &self,
        column: &'static str,
        value: T,
    ) -> Result<Option<Complaint>, StoreError>
    where
        T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {} FROM complaints WHERE {} = $1", COMPLAINT_COLUMNS, column);
        sqlx::query_as::<_, ComplaintRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(Complaint::try_from)
            .transpose()
    }
}

fn push_request_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &RequestFilterParams) {
    if let Some(status) = filters.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(document_type) = filters.document_type {
        builder
            .push(" AND document_type = ")
            .push_bind(document_type.as_str());
    }
}

impl RequestStore for PgStore {
    fn insert_student(&self, student: NewStudent) -> StoreFuture<'_, Student> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO students (email, first_name, last_name, cin, cne, level, program, \
                 birth_date, birth_place, transcript) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
                STUDENT_COLUMNS
            );
            let row = sqlx::query_as::<_, StudentRow>(&sql)
                .bind(&student.email)
                .bind(&student.first_name)
                .bind(&student.last_name)
                .bind(&student.cin)
                .bind(&student.cne)
                .bind(&student.level)
                .bind(&student.program)
                .bind(student.birth_date)
                .bind(&student.birth_place)
                .bind(student.transcript.as_ref().map(Json))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::Conflict(
                            "A student with this email or CIN already exists".to_string(),
                        )
                    } else {
                        StoreError::from(e)
                    }
                })?;
            Ok(row.into())
        })
    }

    fn find_student(&self, id: StudentId) -> StoreFuture<'_, Option<Student>> {
        Box::pin(async move {
            let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
            let row = sqlx::query_as::<_, StudentRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Student::from))
        })
    }

    fn find_student_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<Student>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {} FROM students WHERE LOWER(email) = LOWER($1)",
                STUDENT_COLUMNS
            );
            let row = sqlx::query_as::<_, StudentRow>(&sql)
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Student::from))
        })
    }

    fn next_sequence<'a>(&'a self, prefix: &'a str, year: i32) -> StoreFuture<'a, i64> {
        Box::pin(async move {
            let pattern = format!("{}-{}-%", prefix, year);
            let value = sqlx::query_scalar::<_, i64>(
                r#"INSERT INTO reference_sequences (prefix, year, last_value)
                   VALUES (
                       $1,
                       $2,
                       1 + (SELECT COUNT(*) FROM requests WHERE reference LIKE $3)
                         + (SELECT COUNT(*) FROM complaints WHERE reference LIKE $3)
                   )
                   ON CONFLICT (prefix, year)
                   DO UPDATE SET last_value = reference_sequences.last_value + 1
                   RETURNING last_value"#,
            )
            .bind(prefix)
            .bind(year)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
            Ok(value)
        })
    }

    fn insert_request(&self, request: NewRequest) -> StoreFuture<'_, DocumentRequest> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO requests (reference, student_id, document_type, specific_details, \
                 template_data, generated_document_path) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
                REQUEST_COLUMNS
            );
            let row = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(&request.reference)
                .bind(request.student_id)
                .bind(request.document_type.as_str())
                .bind(Json(&request.specific_details))
                .bind(request.template_data.as_ref().map(Json))
                .bind(&request.generated_document_path)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::Conflict(format!(
                            "Reference {} already exists",
                            request.reference
                        ))
                    } else {
                        StoreError::from(e)
                    }
                })?;
            DocumentRequest::try_from(row)
        })
    }

    fn update_request<'a>(
        &'a self,
        request: &'a DocumentRequest,
    ) -> StoreFuture<'a, DocumentRequest> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE requests SET status = $2, specific_details = $3, template_data = $4, \
                 generated_document_path = $5, document_path = $6, document_uploaded = $7, \
                 refusal_reason = $8, updated_at = NOW() \
                 WHERE id = $1 RETURNING {}",
                REQUEST_COLUMNS
            );
            let row = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(request.id)
                .bind(request.status.as_str())
                .bind(Json(&request.specific_details))
                .bind(request.template_data.as_ref().map(Json))
                .bind(&request.generated_document_path)
                .bind(&request.document_path)
                .bind(request.document_uploaded)
                .bind(&request.refusal_reason)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound("Request"))?;
            DocumentRequest::try_from(row)
        })
    }

    fn find_request(&self, id: RequestId) -> StoreFuture<'_, Option<DocumentRequest>> {
        Box::pin(self.request_where("id", id))
    }

    fn find_request_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<DocumentRequest>> {
        Box::pin(self.request_where("reference", reference.to_string()))
    }

    fn list_requests<'a>(
        &'a self,
        filters: &'a RequestFilterParams,
    ) -> StoreFuture<'a, (Vec<DocumentRequest>, i64)> {
        Box::pin(async move {
            let mut count =
                QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM requests WHERE 1 = 1");
            push_request_filters(&mut count, filters);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await?;

            let mut query = QueryBuilder::<Postgres>::new(format!(
                "SELECT {} FROM requests WHERE 1 = 1",
                REQUEST_COLUMNS
            ));
            push_request_filters(&mut query, filters);
            query
                .push(" ORDER BY created_at DESC, id DESC LIMIT ")
                .push_bind(filters.pagination.limit())
                .push(" OFFSET ")
                .push_bind(filters.pagination.offset());

            let rows = query
                .build_query_as::<RequestRow>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(DocumentRequest::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    fn insert_complaint(&self, complaint: NewComplaint) -> StoreFuture<'_, Complaint> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO complaints (reference, request_id, reason, description) \
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                COMPLAINT_COLUMNS
            );
            let row = sqlx::query_as::<_, ComplaintRow>(&sql)
                .bind(&complaint.reference)
                .bind(complaint.request_id)
                .bind(&complaint.reason)
                .bind(&complaint.description)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::Conflict(
                            "A complaint already exists for this request".to_string(),
                        )
                    } else {
                        StoreError::from(e)
                    }
                })?;
            Complaint::try_from(row)
        })
    }

    fn update_complaint<'a>(&'a self, complaint: &'a Complaint) -> StoreFuture<'a, Complaint> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE complaints SET status = $2, response = $3, regenerated = $4, \
                 updated_at = NOW() WHERE id = $1 RETURNING {}",
                COMPLAINT_COLUMNS
            );
            let row = sqlx::query_as::<_, ComplaintRow>(&sql)
                .bind(complaint.id)
                .bind(complaint.status.as_str())
                .bind(&complaint.response)
                .bind(complaint.regenerated)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound("Complaint"))?;
            Complaint::try_from(row)
        })
    }

    fn find_complaint(&self, id: ComplaintId) -> StoreFuture<'_, Option<Complaint>> {
        Box::pin(self.complaint_where("id", id))
    }

    fn find_complaint_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<Complaint>> {
        Box::pin(self.complaint_where("reference", reference.to_string()))
    }

    fn find_complaint_by_request(
        &self,
        request_id: RequestId,
    ) -> StoreFuture<'_, Option<Complaint>> {
        Box::pin(self.complaint_where("request_id", request_id))
    }

    fn list_complaints<'a>(
        &'a self,
        filters: &'a ComplaintFilterParams,
    ) -> StoreFuture<'a, (Vec<Complaint>, i64)> {
        Box::pin(async move {
            let status = filters.status.map(|s| s.as_str());

            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM complaints WHERE ($1::TEXT IS NULL OR status = $1)",
            )
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

            let sql = format!(
                "SELECT {} FROM complaints WHERE ($1::TEXT IS NULL OR status = $1) \
                 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
                COMPLAINT_COLUMNS
            );
            let rows = sqlx::query_as::<_, ComplaintRow>(&sql)
                .bind(status)
                .bind(filters.pagination.limit())
                .bind(filters.pagination.offset())
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Complaint::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }
}
