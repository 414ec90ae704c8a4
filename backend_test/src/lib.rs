use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat,
    PathArguments, Signature, Type,
};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the database is dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], [`crate::model::mongodb::Coll<T>`], and, when the
/// test is given `judge` or `admin` as an argument, the
/// [`rocket::http::Header`] that authenticates as that user.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let login = parse_macro_input!(args as Option<Ident>);

    // Pick the user to sign in as, if any.
    let maybe_user = match login {
        Some(ref role) if role == "judge" => Some(quote! {
            crate::model::db::user::NewUser::example_judge()
        }),
        Some(ref role) if role == "admin" => Some(quote! {
            crate::model::db::user::NewUser::example_admin()
        }),
        Some(role) => {
            return syn::Error::new(role.span(), "Expected `judge` or `admin`")
                .into_compile_error()
                .into();
        }
        None => None,
    };

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone(), maybe_user.is_some()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let sign_in = match maybe_user {
        Some(user) => quote! {
            Some(crate::api::sign_in(&rocket_client, &db, #user).await)
        },
        None => quote! { None },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                mongodb::Database,
                Option<rocket::http::Header<'static>>,
            ) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client.clone(), &db_name).await,
                )
                .await
                .unwrap();
                let db = db_client.database(&db_name);
                let auth_header = #sign_in;

                (rocket_client, db, auth_header)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, db, auth_header) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let auth_mutex = std::sync::Mutex::new(auth_header);
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let auth_header = auth_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async and work out what to pass for each parameter.
fn check_sig(sig: Signature, signed_in: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut has_header = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself
                let last = type_path.path.segments.last().unwrap();
                if last.ident == "Client" {
                    if has_client {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    has_client = true;
                    args.push(quote! { rocket_client });
                    continue;
                } else if last.ident == "Database" {
                    if has_db {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `mongodb::Database`",
                        ));
                    }
                    has_db = true;
                    args.push(quote! { db.clone() });
                    continue;
                } else if last.ident == "Header" {
                    if !signed_in {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test must be `#[backend_test(judge)]` or `#[backend_test(admin)]` to accept a `Header`",
                        ));
                    }
                    if has_header {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::http::Header`",
                        ));
                    }
                    has_header = true;
                    args.push(quote! { auth_header.clone().unwrap() });
                    continue;
                } else if last.ident == "Coll" {
                    if let PathArguments::AngleBracketed(generics) = &last.arguments {
                        if let Some(GenericArgument::Type(Type::Path(type_path))) =
                            generics.args.first()
                        {
                            if let Some(type_ident) = type_path.path.get_ident() {
                                args.push(quote! {
                                    crate::model::mongodb::Coll::<#type_ident>::from_db(&db)
                                });
                                continue;
                            }
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `db_ident: Database`, `header_ident: Header` or `collection_ident: Coll<T>`",
        ));
    }

    Ok(args)
}
