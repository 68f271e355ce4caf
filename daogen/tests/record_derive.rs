use daogen::{CompareOperator, FieldDescriptor, LeafField, Record, SourceSql, TypeRef};
use pretty_assertions::assert_eq;

#[allow(dead_code)]
#[derive(Record)]
#[daogen(table = "accounts")]
struct Account {
    id: i64,
    #[daogen(any_of("email", "username"), case_insensitive)]
    login: String,
    #[daogen(op = "greater")]
    age: Option<i32>,
    #[daogen(op = "in", column = "role")]
    roles: Vec<String>,
    #[daogen(encrypt, custom, go_type = "Password")]
    password: String,
    #[daogen(generate = "now")]
    created_at: std::time::SystemTime,
    #[daogen(expr = "coalesce(nick, '')", name = "Nick")]
    nickname: String,
    avatar: Option<Vec<u8>>,
}

#[allow(dead_code)]
#[derive(Record)]
struct BlogPost {
    title: String,
    #[daogen(constant = "'published'", op = "notEqual")]
    status: String,
}

#[test]
fn derives_names_and_table() {
    assert_eq!(Account::NAME, "Account");
    assert_eq!(Account::TABLE, "accounts");
    assert_eq!(BlogPost::NAME, "BlogPost");
    assert_eq!(BlogPost::TABLE, "blog_posts");
}

#[test]
fn derives_field_metadata() {
    let fields = Account::fields();
    let expected: Vec<FieldDescriptor> = vec![
        LeafField::new("Id", TypeRef::named("int64")).into(),
        LeafField::new("Login", TypeRef::named("string"))
            .any_of(["email", "username"])
            .case_insensitive()
            .into(),
        LeafField::new("Age", TypeRef::pointer(TypeRef::named("int32")))
            .operator(CompareOperator::Greater)
            .into(),
        LeafField::new("Roles", TypeRef::slice(TypeRef::named("string")))
            .column("role")
            .operator(CompareOperator::In)
            .into(),
        LeafField::new("Password", TypeRef::named("Password"))
            .custom()
            .encrypted()
            .into(),
        LeafField::new("CreatedAt", TypeRef::named("time.Time"))
            .generator("now")
            .into(),
        LeafField::new("Nick", TypeRef::named("string"))
            .expression("coalesce(nick, '')")
            .into(),
        LeafField::new("Avatar", TypeRef::pointer(TypeRef::slice(TypeRef::named("byte")))).into(),
    ];
    assert_eq!(fields, expected);
}

#[test]
fn column_defaults_to_the_rust_field_name() {
    let fields = Account::fields();
    let created = fields[5].as_leaf().unwrap();
    assert_eq!(created.source, SourceSql::Column("created_at".into()));

    let status = BlogPost::fields()[1].as_leaf().unwrap().clone();
    assert_eq!(status.constant.as_deref(), Some("'published'"));
    assert_eq!(status.operator, CompareOperator::NotEqual);
}

#[allow(dead_code)]
#[derive(Record)]
#[daogen(table = "events")]
struct Event {
    #[daogen(op = "notLess")]
    starts_at: i64,
    #[daogen(op = "starts", column = "title")]
    prefix: String,
}

#[test]
fn legacy_operator_spellings_resolve_through_the_shared_table() {
    let fields = Event::fields();
    assert_eq!(fields[0].as_leaf().unwrap().operator, CompareOperator::GreaterOrEqual);
    assert_eq!(fields[1].as_leaf().unwrap().operator, CompareOperator::StartsWith);
    assert_eq!(CompareOperator::from_name("notLess"), Some(CompareOperator::GreaterOrEqual));
}
